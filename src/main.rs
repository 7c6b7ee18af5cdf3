use clap::Parser;
use safari_motors::repl::{run, Cli};

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(_) => (),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
