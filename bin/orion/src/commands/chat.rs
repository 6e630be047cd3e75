use orion_core::Paths;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

use super::{open_session, render};

const EXIT_WORDS: &[&str] = &["salir", "exit", "quit", "/quit", "/exit"];

/// Interactive loop: one request at a time until EOF or an exit word.
pub async fn run(paths: &Paths) -> anyhow::Result<()> {
    let session = open_session(paths)?;

    println!();
    println!("ORION - asistente de desarrollo");
    println!("  Escribí 'qué puedes hacer' para ver ejemplos, 'salir' para terminar.");
    if let Some(last) = session.history().last()? {
        println!("  Último comando: {} -> {}", last.command, last.result);
    }
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&input.to_lowercase().as_str()) {
            break;
        }

        match session.conversation.process(input).await {
            Ok(result) => println!("{}\n", render::result(&result)),
            Err(e) => {
                error!(error = %e, "Request failed");
                println!("ORION: error: {}\n", e);
            }
        }
    }

    println!("¡Hasta luego!");
    session.close();
    Ok(())
}
