use log::info;
use markov_core::fanfic::Pairing;
use markov_core::updater::UpdateBatch;
use markov_core::{Commands, Config};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Paths and limits come from the file named by MARKOV_CONFIG,
    // defaults otherwise (./data/people, ./data/fanfic, ...)
    let config = Config::from_env()?;
    let commands = Commands::new(config)?;
    info!("repositories: {}", commands.repositories().join(", "));

    // An optional argument names a JSON batch of messages:
    // {"documents": [{"author_id", "author_name", "text", "timestamp"}, ...]}
    // Only messages newer than the stored timestamp are folded in
    if let Some(path) = std::env::args().nth(1) {
        info!("applying update batch {path}");
        let batch: UpdateBatch = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        println!("{}", commands.update(batch)?);
    }

    // Every known corpus, one page per line
    for page in commands.list_corpora() {
        println!("Corpora: {page}");
    }

    // One sentence from the aggregate corpus; errors come back as replies
    let reply = commands.markov(&commands.config().aggregate_name);
    println!("{}: {}", reply.label, reply.text);

    // Names are matched by substring and combined with '+'
    let reply = commands.markov("alice+bob");
    println!("{}: {}", reply.label, reply.text);

    // Words after the person seed the sentence
    let reply = commands.markov("alice the");
    println!("{}: {}", reply.label, reply.text);

    // Extra repositories from [repositories] are addressed by name
    for repository in commands.repositories().into_iter().skip(1) {
        let reply = commands.markov_in(Some(repository), "a");
        println!("[{repository}] {}: {}", reply.label, reply.text);
    }

    // Without a fanfic corpus this prints the missing-file message
    println!("{}", commands.fanfic_reply(None, None, Pairing::Any));

    Ok(())
}
