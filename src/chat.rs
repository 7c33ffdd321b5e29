//! Interactive terminal chat
//!
//! A thin presentation layer over the core pipeline: reads a question,
//! gates it through the legal-relevance pre-filter, sends it to the proxy
//! and streams the reply to the terminal while the session state tracks
//! turns and the thinking/answer split.

use std::cell::RefCell;
use std::io::{BufRead, Write};

use anyhow::Result;
use console::Style;

use themis_core::client::ChatClient;
use themis_core::filter::{is_legal_related, non_legal_guidance};
use themis_core::get_role_by_id;
use themis_core::llm::MessageRole;
use themis_core::ChatSession;

/// Run the chat REPL against a running proxy
pub async fn run_chat(url: &str, role_id: &str) -> Result<()> {
    let role = get_role_by_id(role_id);
    let client = ChatClient::new(url)?;
    let session = RefCell::new(ChatSession::new(&role.display_name, &role.description));

    let assistant_style = Style::new().cyan();
    let dim = Style::new().dim();
    let error_style = Style::new().red();

    println!(
        "{} {}",
        role.avatar,
        assistant_style.apply_to(&role.display_name)
    );
    if let Some(greeting) = session.borrow().turns().first() {
        println!("{}\n", greeting.text);
    }
    println!(
        "{}",
        dim.apply_to("输入问题开始咨询；/clear 重新开始，/exit 退出。")
    );

    let stdin = std::io::stdin();
    loop {
        print!("\n你> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();

        match input {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                session.borrow_mut().clear();
                println!("{}", dim.apply_to("会话已重置。"));
                continue;
            }
            _ => {}
        }

        // Gate non-legal questions locally instead of spending an upstream
        // call on them.
        if !is_legal_related(input) {
            let guidance = non_legal_guidance();
            let mut s = session.borrow_mut();
            s.push_user(input);
            s.push_assistant(&guidance);
            println!("\n{}", guidance);
            continue;
        }

        let history = session.borrow().history();
        {
            let mut s = session.borrow_mut();
            s.push_user(input);
            s.begin_assistant_turn();
        }

        print!("\n");
        client
            .send_message_stream(
                input,
                &history,
                &role.id,
                |chunk| {
                    print!("{}", chunk);
                    let _ = std::io::stdout().flush();
                    session.borrow_mut().apply_chunk(chunk);
                },
                |error| {
                    println!("\n{}", error_style.apply_to(format!("出错了：{}", error)));
                    session.borrow_mut().fail_active_turn(&error);
                },
                || session.borrow_mut().complete_active_turn(),
            )
            .await;
        println!();

        // When the reply carried a thinking preamble, re-render it cleanly
        // separated from the answer.
        let s = session.borrow();
        if let Some(turn) = s
            .turns()
            .iter()
            .rev()
            .find(|t| t.sender == MessageRole::Assistant)
        {
            if !turn.thinking.is_empty() {
                println!("\n{}", dim.apply_to("── 思考过程 ──"));
                println!("{}", dim.apply_to(&turn.thinking));
                println!("{}", dim.apply_to("── 回答 ──"));
                println!("{}", turn.text);
            }
        }
    }

    Ok(())
}
