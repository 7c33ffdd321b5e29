//! Legal-relevance pre-filter
//!
//! A heuristic substring gate, not a classifier: a question counts as legal
//! when any keyword of a fixed legal-domain list appears in it. The calling
//! layer short-circuits with a canned guidance reply instead of spending an
//! upstream call when the gate fails. Legal questions phrased without any
//! listed keyword slip through as false negatives; that is accepted.

/// Fixed legal-domain keyword set
const LEGAL_KEYWORDS: &[&str] = &[
    "法律", "法规", "条文", "合同", "协议", "诉讼", "仲裁", "律师",
    "法院", "判决", "案例", "违约", "侵权", "赔偿", "责任", "权利",
    "义务", "法条", "司法", "执法", "立法", "宪法", "民法", "刑法",
    "行政法", "商法", "劳动法", "婚姻法", "继承法", "知识产权",
];

/// Check whether a message looks like a legal question
pub fn is_legal_related(message: &str) -> bool {
    LEGAL_KEYWORDS.iter().any(|kw| message.contains(kw))
}

/// Canned guidance reply for questions the gate rejected
pub fn non_legal_guidance() -> String {
    "感谢您的问题。我是 獬豸 Themis AI 法律顾问，专门为您提供法律相关的咨询服务。\n\n\
     您的问题似乎不是法律相关的。我可以帮助您解答以下类型的法律问题：\n\
     • 法律条文查询和解释\n\
     • 合同条款分析\n\
     • 法律程序指导\n\
     • 案例分析参考\n\
     • 法律风险评估\n\n\
     请您重新提出一个法律相关的问题，我将竭诚为您服务！"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_question_passes() {
        assert!(is_legal_related("劳动合同纠纷怎么解决？"));
        assert!(is_legal_related("对方违约了我能要求赔偿吗"));
        assert!(is_legal_related("知识产权如何保护"));
    }

    #[test]
    fn test_non_legal_question_fails() {
        assert!(!is_legal_related("今天天气怎么样？"));
        assert!(!is_legal_related("推荐一家好吃的餐厅"));
        assert!(!is_legal_related(""));
    }

    #[test]
    fn test_guidance_mentions_what_to_do_next() {
        let guidance = non_legal_guidance();
        assert!(guidance.contains("法律相关"));
        assert!(guidance.contains("重新提出"));
    }
}
