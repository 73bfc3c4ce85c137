//! Command-line driver for a generation session.
//!
//! Wires a [`genloop::Session`] over the deterministic reference engine:
//! queue the prompt, prime the context, ingest, then stream sampled tokens
//! to stdout. Interactive mode hands control back to the user whenever the
//! reverse prompt appears or the budget runs out.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;

use genloop::{
    tokenizer, ReferenceEngine, SamplingConfig, Session, SessionConfig, SessionError, StatsSink,
};

/// genloop — autoregressive generation session demo
#[derive(Parser)]
#[command(name = "genloop", version)]
struct Cli {
    /// Prompt to start generation with.
    #[arg(short, long, default_value = "")]
    prompt: String,

    /// Read the prompt from a file instead.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Run in interactive mode.
    #[arg(short, long)]
    interactive: bool,

    /// Instruct mode: wrap each user input in an instruction template.
    #[arg(long)]
    instruct: bool,

    /// In interactive mode, poll user input upon seeing this phrase.
    #[arg(short = 'r', long)]
    reverse_prompt: Option<String>,

    /// RNG seed (negative = derive from the clock).
    #[arg(short, long, default_value_t = -1)]
    seed: i64,

    /// Number of threads the engine may use.
    #[arg(short, long, default_value_t = 4)]
    threads: usize,

    /// Number of tokens to predict.
    #[arg(short, long, default_value_t = 128)]
    n_predict: usize,

    /// Top-k sampling.
    #[arg(long, default_value_t = 40)]
    top_k: usize,

    /// Top-p (nucleus) sampling.
    #[arg(long, default_value_t = 0.95)]
    top_p: f32,

    /// Last n tokens to consider for the repeat penalty.
    #[arg(long, default_value_t = 64)]
    repeat_last_n: usize,

    /// Penalty for repeated token sequences.
    #[arg(long, default_value_t = 1.30)]
    repeat_penalty: f32,

    /// Size of the prompt context.
    #[arg(short = 'c', long, default_value_t = 4096)]
    ctx_size: usize,

    /// Sampling temperature.
    #[arg(long, default_value_t = 0.8)]
    temp: f32,

    /// Batch size for prompt processing.
    #[arg(short, long, default_value_t = 8)]
    batch_size: usize,

    /// Echo ingested prompt tokens as they are consumed.
    #[arg(long)]
    echo: bool,
}

/// Sink that prints echoed tokens to stdout and stats lines to stderr.
struct ConsoleStats;

impl StatsSink for ConsoleStats {
    fn on_start(&self, stats: &genloop::SessionStats) {
        eprintln!(
            "[session start: seed {}, n_ctx {}, n_predict {}]",
            stats.seed, stats.n_ctx, stats.n_predict
        );
    }

    fn on_end(&self, stats: &genloop::SessionStats) {
        eprintln!(
            "[session end: {} ingested, {} generated]",
            stats.ingested_tokens, stats.generated_tokens
        );
    }

    fn on_token(&self, text: &str) {
        print!("{text}");
        let _ = io::stdout().flush();
    }
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(mut cli: Cli) -> Result<(), SessionError> {
    if let Some(path) = &cli.file {
        match std::fs::read_to_string(path) {
            Ok(contents) => cli.prompt = contents.trim().to_string(),
            Err(e) => {
                eprintln!("error: cannot read {}: {e}", path.display());
                std::process::exit(1);
            }
        }
    }

    // Leading space matches the reference tokenizer's prompt convention.
    let prompt = format!(" {}", cli.prompt);

    let config = SessionConfig {
        n_ctx: cli.ctx_size,
        n_predict: cli.n_predict,
        n_batch: cli.batch_size,
        n_threads: cli.threads,
        seed: cli.seed,
        sampling: SamplingConfig {
            temperature: cli.temp,
            top_k: cli.top_k,
            top_p: cli.top_p,
            repeat_penalty: cli.repeat_penalty,
            repeat_last_n: cli.repeat_last_n,
        },
    };

    let mut session = Session::<ReferenceEngine>::create(config)?;
    session.set_stats_sink(Box::new(ConsoleStats));

    session.add_begin_marker()?;
    session.update_input(&prompt)?;
    session.prepare()?;

    // Instruction template token sequences, used in instruct mode.
    let inp_pfx = tokenizer::tokenize(session.vocab(), "\n\n### Instruction:\n\n", true);
    let inp_sfx = tokenizer::tokenize(session.vocab(), "\n\n### Response:\n\n", false);

    if cli.instruct {
        cli.interactive = true;
        cli.reverse_prompt = Some("### Instruction:\n\n".to_string());
    }
    if let Some(reverse) = &cli.reverse_prompt {
        cli.interactive = true;
        session.set_antiprompt(reverse);
    }

    let mut is_interacting = false;
    if cli.interactive {
        println!("== Running in interactive mode. ==");
        println!(" - Press Return to return control to the model.");
        println!(" - End your input with '\\' to submit another line.");
        println!();
        is_interacting = true;
    }

    let mut input_noecho = false;
    let mut stdout = io::stdout();

    while !session.is_finished() {
        let mut step_finished = false;

        if session.has_unconsumed_input() {
            if !session.ingest_pending(cli.echo && !input_noecho)? {
                eprintln!("error: context is full, cannot ingest remaining input");
                break;
            }
        } else {
            let (text, finished) = session.infer_next_text()?;
            print!("{text}");
            let _ = stdout.flush();
            input_noecho = false;
            step_finished = finished;
        }

        if step_finished && !cli.interactive {
            println!(" [end of text]");
            break;
        }

        if cli.interactive {
            // Re-arm the budget before taking input, so queued text lands
            // in an idle session.
            if session.is_finished() {
                session.reset_remaining_tokens();
                is_interacting = true;
            }
            if session.is_antiprompt_present() {
                is_interacting = true;
            }
            if is_interacting && !session.has_unconsumed_input() {
                if cli.instruct {
                    session.update_input_tokens(&inp_pfx)?;
                    print!("\n> ");
                    let _ = stdout.flush();
                }

                read_interactive_input(&mut session)?;

                if cli.instruct {
                    session.update_input_tokens(&inp_sfx)?;
                }
                input_noecho = true;
                is_interacting = false;
            }
        }
    }

    Ok(())
}

/// Read user lines, treating a trailing backslash as line continuation.
fn read_interactive_input(
    session: &mut Session<ReferenceEngine>,
) -> Result<(), SessionError> {
    let stdin = io::stdin();
    loop {
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return Ok(()), // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("read error: {e}");
                return Ok(());
            }
        }

        let trimmed = line.trim_end_matches(['\n', '\r']);
        if let Some(continued) = trimmed.strip_suffix('\\') {
            session.update_input(continued)?;
        } else {
            session.update_input(trimmed)?;
            return Ok(());
        }
    }
}
