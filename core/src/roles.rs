//! Role registry
//!
//! Maps a role identifier to a display profile and the system prompt that
//! defines the assistant's persona for that specialization. Profiles are
//! immutable and loaded once; unknown ids silently fall back to the general
//! role so a stale client never produces an error.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Identifier of the fallback role
pub const DEFAULT_ROLE_ID: &str = "general";

/// A named persona with its display profile and system prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleProfile {
    /// Stable identifier used in requests
    pub id: String,
    /// Display name
    pub display_name: String,
    /// Emoji avatar shown next to the name
    pub avatar: String,
    /// Short professional title
    pub title: String,
    /// One-line description
    pub description: String,
    /// Areas of specialization, in display order
    pub specialties: Vec<String>,
    /// Instruction string prepended to every upstream request
    pub system_prompt: String,
}

fn role(
    id: &str,
    display_name: &str,
    avatar: &str,
    title: &str,
    description: &str,
    specialties: &[&str],
    system_prompt: &str,
) -> RoleProfile {
    RoleProfile {
        id: id.to_string(),
        display_name: display_name.to_string(),
        avatar: avatar.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        specialties: specialties.iter().map(|s| s.to_string()).collect(),
        system_prompt: system_prompt.to_string(),
    }
}

lazy_static! {
    static ref ROLES: Vec<RoleProfile> = vec![
        role(
            "general",
            "獬豸 Themis AI",
            "⚖️",
            "综合法律顾问",
            "覆盖各领域的通用法律咨询",
            &["法律咨询", "条文解读", "案例分析"],
            "你是獬豸 Themis AI，一个专业的法律AI助手。请提供准确、专业的法律建议，并注明相关法律条文。",
        ),
        role(
            "corporate",
            "企业法务专家",
            "🏢",
            "公司法 / 商事专家",
            "企业合规、合同审查与商事纠纷",
            &["公司法", "合同法", "商事纠纷"],
            "你是獬豸 Themis AI的企业法务专家，专门处理公司法、合同法、商事纠纷等企业法律事务。",
        ),
        role(
            "civil",
            "民事法律专家",
            "🏠",
            "民事纠纷专家",
            "民事纠纷、婚姻家庭与财产继承",
            &["民事纠纷", "婚姻家庭", "财产继承"],
            "你是獬豸 Themis AI的民事法律专家，专门处理民事纠纷、婚姻家庭、财产继承等民事法律问题。",
        ),
        role(
            "criminal",
            "刑事法律专家",
            "🛡️",
            "刑事辩护专家",
            "刑事案件、刑事辩护与刑事合规",
            &["刑事案件", "刑事辩护", "刑事合规"],
            "你是獬豸 Themis AI的刑事法律专家，专门处理刑事案件、刑事辩护、刑事合规等刑事法律事务。",
        ),
        role(
            "ip",
            "知识产权专家",
            "💡",
            "知识产权专家",
            "专利、商标与著作权保护",
            &["专利", "商标", "著作权"],
            "你是獬豸 Themis AI的知识产权专家，专门处理专利、商标、著作权等知识产权法律问题。",
        ),
        role(
            "labor",
            "劳动法专家",
            "👷",
            "劳动争议专家",
            "劳动合同、工伤赔偿与劳动争议",
            &["劳动合同", "工伤赔偿", "劳动争议"],
            "你是獬豸 Themis AI的劳动法专家，专门处理劳动合同、工伤赔偿、劳动争议等劳动法律事务。",
        ),
        role(
            "academic",
            "法学学习助手",
            "📚",
            "法学教育专家",
            "法学学习指导与考试辅导",
            &["法学学习", "考试辅导", "论文指导"],
            "你是獬豸 Themis AI的法学学习助手，专门为法学学生提供学习指导和考试辅导。",
        ),
    ];
}

/// Look up a role by id, falling back to the general role for unknown or
/// empty ids
pub fn get_role_by_id(id: &str) -> &'static RoleProfile {
    ROLES
        .iter()
        .find(|r| r.id == id)
        .unwrap_or_else(|| &ROLES[0])
}

/// All roles in definition order
pub fn list_roles() -> &'static [RoleProfile] {
    &ROLES
}
