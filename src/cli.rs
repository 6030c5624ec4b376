//! CLI (§6.5): `crawl`, `index`, `search`, plus `train-classifier` and
//! `serve`. `search` launches an interactive REPL; `title:`/`author:`/
//! `abstract:` prefixes invoke `search_field`, otherwise the full planner
//! runs.

use crate::config::ResolvedConfig;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Academic publication search engine", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch publication records from a list of URLs and write a Corpus JSON file
    Crawl {
        /// URLs to fetch, each expected to serve the Corpus JSON contract
        #[arg(value_name = "URL")]
        urls: Vec<String>,

        /// Where to write the resulting Corpus JSON array
        #[arg(short, long, default_value = "corpus.json")]
        output: PathBuf,
    },

    /// Build the positional/TF-IDF index from a Corpus JSON file
    Index {
        /// Input Corpus JSON file
        #[arg(value_name = "CORPUS_FILE")]
        corpus_file: Option<PathBuf>,

        /// Where to persist the built index artifact
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Launch an interactive search REPL against a built index
    Search {
        /// Index artifact to load
        #[arg(short, long)]
        index_file: Option<PathBuf>,
    },

    /// Train a classifier from a labeled CSV and persist the model
    TrainClassifier {
        /// Labeled CSV with Title, Content, Category columns
        #[arg(value_name = "LABELED_CSV")]
        labeled_csv: PathBuf,

        /// Where to persist the trained classifier artifact
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Launch the HTTP surface
    Serve {
        /// Bind address, e.g. 127.0.0.1:8080
        #[arg(short, long)]
        bind: Option<String>,

        /// Index artifact to load at startup
        #[arg(long)]
        index_file: Option<PathBuf>,

        /// Classifier artifact to load at startup
        #[arg(long)]
        classifier_file: Option<PathBuf>,
    },
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    let config = crate::config::ScholarConfig::load()?;

    match args.command {
        Command::Crawl { urls, output } => run_crawl(&urls, &output, &config).await,
        Command::Index { corpus_file, output } => run_index(
            corpus_file.unwrap_or_else(|| config.corpus_file.clone()),
            output.unwrap_or_else(|| config.index_file.clone()),
        ),
        Command::Search { index_file } => {
            run_search(index_file.unwrap_or_else(|| config.index_file.clone()))
        }
        Command::TrainClassifier { labeled_csv, output } => run_train_classifier(
            &labeled_csv,
            &output.unwrap_or_else(|| config.classifier_file.clone()),
        ),
        Command::Serve {
            bind,
            index_file,
            classifier_file,
        } => {
            run_serve(
                bind.unwrap_or_else(|| config.bind_addr.clone()),
                index_file.unwrap_or_else(|| config.index_file.clone()),
                classifier_file.unwrap_or_else(|| config.classifier_file.clone()),
                config.allowed_origins.clone(),
            )
            .await
        }
    }
}

async fn run_crawl(urls: &[String], output: &PathBuf, config: &ResolvedConfig) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let parser = Arc::new(crate::crawler::SimpleListParser);
    let documents = crate::crawler::fetch_all(&client, urls, parser, config.crawl_options()).await;

    let json = serde_json::to_string_pretty(&documents)?;
    std::fs::write(output, json)?;
    println!(
        "{} {} {}",
        "crawled".green(),
        documents.len(),
        format!("documents to {}", output.display()).dimmed()
    );
    Ok(())
}

fn run_index(corpus_file: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let index = crate::index::Index::build_from_corpus_file(&corpus_file)?;
    index.save_atomic(&output)?;
    println!(
        "{} {} {}",
        "indexed".green(),
        index.len(),
        format!("documents to {}", output.display()).dimmed()
    );
    Ok(())
}

fn run_search(index_file: PathBuf) -> anyhow::Result<()> {
    let index = crate::index::Index::load(&index_file)?;
    let planner = crate::query::Planner::new(Arc::new(index));

    println!("{}", "Enter a query, or 'exit'/'quit' to stop.".dimmed());
    println!("{}", "Prefix with title:, author:, or abstract: to search a single field.".dimmed());

    let stdin = io::stdin();
    loop {
        print!("\n{} ", "query>".cyan());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        let results = if let Some((prefix, text)) = line.split_once(':') {
            match crate::query::Field::from_str(prefix.trim()) {
                Ok(field) => planner.search_field(text.trim(), field, 10),
                Err(_) => planner.search(line, 10),
            }
        } else {
            planner.search(line, 10)
        };

        if results.is_empty() {
            println!("{}", "no results".dimmed());
            continue;
        }
        for (rank, result) in results.iter().enumerate() {
            println!(
                "{}. {} {}",
                rank + 1,
                result.title.bold(),
                format!("({:.4})", result.relevancy_score).dimmed()
            );
        }
    }
    Ok(())
}

fn run_train_classifier(labeled_csv: &PathBuf, output: &PathBuf) -> anyhow::Result<()> {
    let examples = crate::classify::load_labeled_csv(labeled_csv)?;
    let (classifier, metrics) = crate::classify::train(&examples)?;
    classifier.save_atomic(output)?;

    println!(
        "{} accuracy={:.4} macro_f1={:.4}",
        "evaluated".green(),
        metrics.accuracy,
        metrics.macro_f1
    );
    println!(
        "{} {} {}",
        "trained classifier with".green(),
        classifier.labels().len(),
        format!("categories to {}", output.display()).dimmed()
    );
    Ok(())
}

async fn run_serve(
    bind: String,
    index_file: PathBuf,
    classifier_file: PathBuf,
    allowed_origins: Vec<String>,
) -> anyhow::Result<()> {
    let state = crate::http::AppState::empty();

    match crate::index::Index::load(&index_file) {
        Ok(index) => *state.index.write().expect("index lock poisoned") = Some(Arc::new(index)),
        Err(e) => tracing::warn!("starting without an index: {e}"),
    }

    match crate::classify::Classifier::load(&classifier_file) {
        Ok(classifier) => {
            *state.classifier.write().expect("classifier lock poisoned") = Some(Arc::new(classifier))
        }
        Err(e) => tracing::warn!("starting without a classifier: {e}"),
    }

    let router = crate::http::build_router(state, &allowed_origins);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("listening on {bind}");
    axum::serve(listener, router).await?;
    Ok(())
}
