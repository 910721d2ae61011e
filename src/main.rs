use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

mod card;
mod extract;
mod frequency;
mod parallel;
mod pipeline;
mod stream;
mod templates;

use extract::CardExtractor;
use frequency::FrequencyList;
use parallel::{process_batch_parallel, process_channel_pipeline, ParallelConfig};
use pipeline::{Outcome, Pipeline, Skip};
use stream::{open_input, scan_pages};

/// Processing strategy for the dump scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Sequential processing (baseline)
    Sequential,
    /// Batch-parallel processing with a thread pool
    BatchParallel,
    /// Channel-based pipeline processing
    ChannelPipeline,
}

#[derive(Parser)]
#[command(name = "wikicards")]
#[command(about = "Fast Rust-based Wiktionary card data generator - outputs one card per part-of-speech section")]
struct Args {
    /// Input dump file (.xml or .xml.bz2)
    input: PathBuf,

    /// Output JSONL file of card records
    output: PathBuf,

    /// Language to generate cards for, by its English name (e.g. "English", "Finnish")
    #[arg(short = 'l', long, default_value = "English")]
    target_language: String,

    /// CSV frequency list (rank,word,part_of_speech); only listed words are kept
    #[arg(short = 'f', long)]
    frequency_file: Option<PathBuf>,

    /// Drop definitions that resolve to an empty string
    #[arg(long)]
    drop_empty_definitions: bool,

    /// Processing strategy
    #[arg(short, long, value_enum, default_value_t = Strategy::Sequential)]
    strategy: Strategy,

    /// Number of threads (0 = auto-detect)
    #[arg(short, long, default_value_t = 0)]
    threads: usize,

    /// Batch size for the batch-parallel strategy
    #[arg(long, default_value_t = 1000)]
    batch_size: usize,

    /// Channel buffer size for the channel-pipeline strategy
    #[arg(long, default_value_t = 10000)]
    channel_buffer: usize,

    /// Limit number of cards to write (for testing)
    #[arg(long)]
    limit: Option<usize>,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Default)]
pub struct Stats {
    pub pages_processed: usize,
    pub words_written: usize,
    pub cards_written: usize,
    pub definitions_written: usize,
    pub empty_cards: usize,
    pub missing_fields: usize,
    pub special: usize,
    pub redirects: usize,
    pub titlecase: usize,
    pub non_target: usize,
    pub not_in_frequency_list: usize,
    pub no_cards: usize,
    pub elapsed: Duration,
}

impl Stats {
    fn count_skip(&mut self, reason: Skip) {
        match reason {
            Skip::MissingFields => self.missing_fields += 1,
            Skip::SpecialNamespace | Skip::SpecialTitle => self.special += 1,
            Skip::Redirect => self.redirects += 1,
            Skip::TitleCase => self.titlecase += 1,
            Skip::MissingLanguageSection => self.non_target += 1,
            Skip::NotInFrequencyList => self.not_in_frequency_list += 1,
            Skip::NoCards => self.no_cards += 1,
        }
    }
}

/// Record one outcome: update counters and write surviving cards as JSONL.
/// Cards without definitions are suppressed here, per the sink contract.
/// Returns false once the card limit is reached.
pub fn write_outcome<W: Write>(
    stats: &mut Stats,
    writer: &mut W,
    outcome: Outcome,
    limit: Option<usize>,
) -> std::io::Result<bool> {
    stats.pages_processed += 1;

    match outcome {
        Outcome::Skipped(reason) => stats.count_skip(reason),
        Outcome::Cards(cards) => {
            let mut wrote_any = false;
            for card in cards {
                if !card.has_definitions() {
                    stats.empty_cards += 1;
                    continue;
                }
                let json = serde_json::to_string(&card)?;
                writeln!(writer, "{}", json)?;
                stats.cards_written += 1;
                stats.definitions_written += card.definitions.len();
                wrote_any = true;

                if let Some(l) = limit {
                    if stats.cards_written >= l {
                        if wrote_any {
                            stats.words_written += 1;
                        }
                        return Ok(false);
                    }
                }
            }
            if wrote_any {
                stats.words_written += 1;
            } else {
                stats.no_cards += 1;
            }
        }
    }

    Ok(true)
}

fn run_sequential(
    reader: impl BufRead,
    writer: &mut BufWriter<File>,
    pipeline: &Pipeline,
    limit: Option<usize>,
    quiet: bool,
) -> std::io::Result<Stats> {
    let start_time = Instant::now();
    let mut stats = Stats::default();

    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg}")
                .unwrap(),
        );
        pb
    };

    let mut limit_reached = false;
    let mut io_err: Option<std::io::Error> = None;

    scan_pages(reader, |page_xml| {
        if !quiet && stats.pages_processed > 0 && stats.pages_processed % 1000 == 0 {
            let elapsed = start_time.elapsed().as_secs_f64();
            let rate = stats.pages_processed as f64 / elapsed;
            pb.set_message(format!(
                "Pages: {} | Cards: {} | Words: {} | Rate: {:.0} pg/s",
                stats.pages_processed, stats.cards_written, stats.words_written, rate
            ));
        }

        let outcome = pipeline.process(&page_xml);
        match write_outcome(&mut stats, writer, outcome, limit) {
            Ok(true) => true,
            Ok(false) => {
                limit_reached = true;
                false
            }
            Err(e) => {
                io_err = Some(e);
                false
            }
        }
    })?;

    if let Some(e) = io_err {
        return Err(e);
    }
    writer.flush()?;

    if limit_reached && !quiet {
        pb.finish_with_message(format!("Reached limit of {} cards", limit.unwrap()));
    } else {
        pb.finish_and_clear();
    }

    stats.elapsed = start_time.elapsed();
    Ok(stats)
}

fn print_stats(stats: &Stats, strategy_name: &str) {
    println!();
    println!("============================================================");
    println!("Strategy: {}", strategy_name);
    println!("Pages processed: {}", stats.pages_processed);
    println!("Words with cards: {}", stats.words_written);
    println!("Cards written: {}", stats.cards_written);
    println!("Definitions written: {}", stats.definitions_written);
    println!(
        "Avg cards/word: {:.2}",
        stats.cards_written as f64 / stats.words_written.max(1) as f64
    );
    println!("------------------------------------------------------------");
    println!("Special pages: {}", stats.special);
    println!("Redirects: {}", stats.redirects);
    println!("Title-case duplicates: {}", stats.titlecase);
    println!("Non-target entries: {}", stats.non_target);
    println!("Not in frequency list: {}", stats.not_in_frequency_list);
    println!("Entries without cards: {}", stats.no_cards);
    println!("Empty cards suppressed: {}", stats.empty_cards);
    println!("Malformed records: {}", stats.missing_fields);
    println!(
        "Time: {}m {}s",
        stats.elapsed.as_secs() / 60,
        stats.elapsed.as_secs() % 60
    );
    println!(
        "Rate: {:.0} pages/sec",
        stats.pages_processed as f64 / stats.elapsed.as_secs_f64()
    );
    println!("============================================================");
}

fn main() -> std::io::Result<()> {
    let args = Args::parse();

    // --limit needs in-order early termination, which only sequential gives
    if args.limit.is_some() && args.strategy != Strategy::Sequential {
        eprintln!(
            "Error: --limit requires --strategy sequential.\n\
             Parallel strategies process pages out of order and cannot stop\n\
             early at an exact card count."
        );
        std::process::exit(1);
    }

    let frequency = match &args.frequency_file {
        Some(path) => {
            let list = FrequencyList::load(path)?;
            if !args.quiet {
                println!(
                    "Frequency list: {} words ({} malformed lines skipped)",
                    list.len(),
                    list.malformed_lines
                );
            }
            Some(list)
        }
        None => None,
    };

    let extractor = CardExtractor::new(&args.target_language, args.drop_empty_definitions);
    let pipeline = Arc::new(Pipeline::new(extractor, frequency));

    let mut config = ParallelConfig::default();
    if args.threads > 0 {
        config.num_threads = args.threads;
        config.num_workers = args.threads.saturating_sub(1).max(1);
    }
    config.batch_size = args.batch_size;
    config.channel_buffer = args.channel_buffer;

    if !args.quiet {
        println!("Parsing: {}", args.input.display());
        println!("Output: {}", args.output.display());
        println!("Target language: {}", args.target_language);
        println!("Strategy: {:?}", args.strategy);
        if args.strategy != Strategy::Sequential {
            println!("Threads: {}", config.num_threads);
        }
        if let Some(limit) = args.limit {
            println!("Limit: {} cards", limit);
        }
        println!();
    }

    let stats = match args.strategy {
        Strategy::Sequential => {
            let reader = open_input(&args.input)?;
            let output = File::create(&args.output)?;
            let mut writer = BufWriter::with_capacity(256 * 1024, output);
            run_sequential(reader, &mut writer, &pipeline, args.limit, args.quiet)?
        }

        Strategy::BatchParallel => {
            let reader = open_input(&args.input)?;
            let output = File::create(&args.output)?;
            let mut writer = BufWriter::with_capacity(256 * 1024, output);
            process_batch_parallel(reader, &mut writer, &pipeline, &config)?
        }

        Strategy::ChannelPipeline => {
            let reader = open_input(&args.input)?;
            let output = File::create(&args.output)?;
            process_channel_pipeline(reader, output, &pipeline, &config)?
        }
    };

    if !args.quiet {
        print_stats(&stats, &format!("{:?}", args.strategy));
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests for the Sink Contract
// ─────────────────────────────────────────────────────────────────────────────
