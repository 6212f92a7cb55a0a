use std::{cell::Cell, error::Error, io, rc::Rc, time::Duration};

use blockd::{
    ClientConfig, LockClient, LockMode, PromptError, ShellCommand,
    config::{DEFAULT_HOST, DEFAULT_PORT},
    execute, prompt,
};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Host running the blockd server
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    /// Port the blockd server listens on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Default acquire timeout in milliseconds
    #[arg(long)]
    timeout: Option<u64>,
    /// Default lock mode (r or w)
    #[arg(long)]
    mode: Option<LockMode>,
    /// Let readers starve writers on reader/writer locks
    #[arg(long)]
    reader_greed: bool,
}

impl Cli {
    fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::default()
            .with_host(self.host.clone())
            .with_port(self.port)
            .with_reader_greed(self.reader_greed);
        if let Some(ms) = self.timeout {
            config = config.with_default_timeout(Duration::from_millis(ms));
        }
        if let Some(mode) = self.mode {
            config = config.with_default_lock_mode(mode);
        }
        config
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize env_logger; For logging to STDOUT/STDERR
    env_logger::init();

    let cli = Cli::parse();
    let client = LockClient::new(cli.config());

    let online = Rc::new(Cell::new(false));
    let flag = Rc::clone(&online);
    client.open()?.then(move |_, _| flag.set(true));
    client.on_error(|e| eprintln!("error: {e}"));

    while !online.get() {
        if !client.poll()? {
            return Err("server closed the connection before the handshake".into());
        }
    }
    println!("connected to {}", client.config().endpoint());

    let stdin = io::stdin();
    let stdout = io::stdout();

    loop {
        let cmd = match prompt(stdin.lock(), stdout.lock()) {
            Ok(c) => c,
            Err(PromptError::Command(e)) => {
                eprintln!("error: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let exit = cmd == ShellCommand::Exit;

        match execute(&client, cmd)? {
            Some(reply) => println!("{reply}"),
            None => {
                eprintln!("connection closed");
                break;
            }
        }

        if exit {
            break;
        }
    }

    Ok(())
}
