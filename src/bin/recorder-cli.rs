use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "recorder-cli")]
#[command(about = "Query recorded exchanges", long_about = None)]
struct Cli {
    /// Base URL of the query server
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List exchange ids recorded for a correlation key, uri and method
    Requests {
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        uri: String,
        #[arg(short, long, default_value = "GET")]
        method: String,
    },
    /// Show the snapshot of one half of an exchange, without its body
    Metadata {
        id: String,
        #[arg(value_parser = ["req", "resp"], default_value = "resp")]
        kind: String,
    },
    /// Print the recorded body of one half of an exchange
    Body {
        id: String,
        #[arg(value_parser = ["req", "resp"], default_value = "resp")]
        kind: String,
    },
    /// Show the server version
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Requests { key, uri, method } => {
            let res = client
                .get(format!("{}/requests", base))
                .query(&[("key", key), ("uri", uri), ("method", method)])
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::Metadata { id, kind } => {
            let res = client.get(format!("{}/metadata/{}/{}", base, id, kind)).send().await?;
            print_json(res).await?;
        }
        Commands::Body { id, kind } => {
            let res = client.get(format!("{}/body/{}/{}", base, id, kind)).send().await?;
            let status = res.status();
            if !status.is_success() {
                return print_error(res).await;
            }
            println!("HTTP {}", status);
            for (name, value) in res.headers() {
                println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
            }
            println!();
            println!("{}", String::from_utf8_lossy(&res.bytes().await?));
        }
        Commands::Version => {
            let res = client.get(format!("{}/version", base)).send().await?;
            println!("{}", res.text().await?);
        }
    }

    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    if !res.status().is_success() {
        return print_error(res).await;
    }
    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

async fn print_error(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Error: query server returned status {}", res.status());
    if let Ok(text) = res.text().await {
        eprintln!("Response: {}", text);
    }
    Ok(())
}
