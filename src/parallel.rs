//! Parallel processing strategies for the dump scan.
//!
//! Entries are independent and the pipeline is immutable, so fan-out needs
//! no coordination beyond collecting outcomes:
//! - Batch-parallel (std::thread over batches of pages)
//! - Channel-pipeline (producer-consumer with mpsc channels)

use crate::pipeline::{Outcome, Pipeline};
use crate::stream::scan_pages;
use crate::{write_outcome, Stats};

use std::io::{self, BufRead, BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::sync_channel;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Configuration for parallel processing
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Number of threads for batch processing
    pub num_threads: usize,
    /// Pages per batch
    pub batch_size: usize,
    /// Channel buffer size for pipeline processing
    pub channel_buffer: usize,
    /// Number of worker threads for the pipeline strategy
    pub num_workers: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        let cpus = thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(4);
        Self {
            num_threads: cpus,
            batch_size: 1000,
            channel_buffer: 10000,
            num_workers: cpus.saturating_sub(1).max(1),
        }
    }
}

/// Strategy 1: Batch-Parallel Processing using std::thread.
/// Pages are collected into batches; each batch is split across a thread
/// pool and the outcomes are written from the scanning thread.
pub fn process_batch_parallel<W: Write>(
    reader: impl BufRead,
    writer: &mut BufWriter<W>,
    pipeline: &Arc<Pipeline>,
    config: &ParallelConfig,
) -> io::Result<Stats> {
    let start_time = Instant::now();
    let mut stats = Stats::default();
    let mut batch: Vec<String> = Vec::with_capacity(config.batch_size);
    let mut io_err: Option<io::Error> = None;

    scan_pages(reader, |page_xml| {
        batch.push(page_xml);
        if batch.len() < config.batch_size {
            return true;
        }

        let outcomes = process_batch_threaded(&batch, pipeline, config.num_threads);
        batch.clear();
        for outcome in outcomes {
            if let Err(e) = write_outcome(&mut stats, writer, outcome, None) {
                io_err = Some(e);
                return false;
            }
        }
        true
    })?;

    if let Some(e) = io_err {
        return Err(e);
    }

    // Tail batch
    if !batch.is_empty() {
        for outcome in process_batch_threaded(&batch, pipeline, config.num_threads) {
            write_outcome(&mut stats, writer, outcome, None)?;
        }
    }

    writer.flush()?;
    stats.elapsed = start_time.elapsed();
    Ok(stats)
}

/// Process a batch of pages using multiple threads
fn process_batch_threaded(
    batch: &[String],
    pipeline: &Arc<Pipeline>,
    num_threads: usize,
) -> Vec<Outcome> {
    if batch.is_empty() {
        return vec![];
    }

    let num_threads = num_threads.min(batch.len()).max(1);
    let chunk_size = (batch.len() + num_threads - 1) / num_threads;

    let handles: Vec<JoinHandle<Vec<Outcome>>> = batch
        .chunks(chunk_size)
        .map(|chunk| {
            let chunk: Vec<String> = chunk.to_vec();
            let pipeline = Arc::clone(pipeline);
            thread::spawn(move || chunk.iter().map(|xml| pipeline.process(xml)).collect())
        })
        .collect();

    let mut outcomes = Vec::with_capacity(batch.len());
    for handle in handles {
        if let Ok(chunk_outcomes) = handle.join() {
            outcomes.extend(chunk_outcomes);
        }
    }
    outcomes
}

/// Strategy 2: Channel-Pipeline Processing using std::sync::mpsc.
/// A reader thread streams pages, worker threads run the pipeline, and the
/// main thread writes outcomes as they arrive.
pub fn process_channel_pipeline<W: Write + Send + 'static>(
    reader: impl BufRead + Send + 'static,
    writer: W,
    pipeline: &Arc<Pipeline>,
    config: &ParallelConfig,
) -> io::Result<Stats> {
    let (page_tx, page_rx) = sync_channel::<String>(config.channel_buffer);
    let (outcome_tx, outcome_rx) = sync_channel::<Outcome>(config.channel_buffer);
    let stop = Arc::new(AtomicBool::new(false));
    let start_time = Instant::now();

    // Reader thread: stops when the workers hang up or stop is raised
    let reader_stop = Arc::clone(&stop);
    let reader_handle = thread::spawn(move || {
        let _ = scan_pages(reader, |page_xml| {
            if reader_stop.load(Ordering::Relaxed) {
                return false;
            }
            page_tx.send(page_xml).is_ok()
        });
    });

    // Worker threads share the page receiver behind a mutex
    let page_rx = Arc::new(Mutex::new(page_rx));
    let worker_handles: Vec<JoinHandle<()>> = (0..config.num_workers)
        .map(|_| {
            let rx = Arc::clone(&page_rx);
            let tx = outcome_tx.clone();
            let pipeline = Arc::clone(pipeline);
            thread::spawn(move || loop {
                let page_xml = {
                    let guard = match rx.lock() {
                        Ok(guard) => guard,
                        Err(_) => break,
                    };
                    match guard.recv() {
                        Ok(xml) => xml,
                        Err(_) => break,
                    }
                };
                if tx.send(pipeline.process(&page_xml)).is_err() {
                    break;
                }
            })
        })
        .collect();

    // Drop the extra sender so the outcome channel closes when workers finish
    drop(outcome_tx);

    // Writer in the main thread
    let mut writer = BufWriter::with_capacity(256 * 1024, writer);
    let mut stats = Stats::default();
    let mut write_result: io::Result<()> = Ok(());

    while let Ok(outcome) = outcome_rx.recv() {
        if let Err(e) = write_outcome(&mut stats, &mut writer, outcome, None) {
            stop.store(true, Ordering::SeqCst);
            write_result = Err(e);
            break;
        }
    }

    // Closing the receiver unblocks any worker mid-send
    drop(outcome_rx);
    reader_handle.join().ok();
    for handle in worker_handles {
        handle.join().ok();
    }

    write_result?;
    writer.flush()?;
    stats.elapsed = start_time.elapsed();
    Ok(stats)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests for the Parallel Strategies
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod parallel_tests {
    use super::*;
    use crate::extract::CardExtractor;
    use std::io::Cursor;

    fn page(title: &str, text: &str) -> String {
        format!(
            "<page><title>{}</title><ns>0</ns><id>1</id><text>{}</text></page>",
            title, text
        )
    }

    fn test_pipeline() -> Arc<Pipeline> {
        Arc::new(Pipeline::new(CardExtractor::new("English", false), None))
    }

    fn dump(words: &[&str]) -> Vec<u8> {
        words
            .iter()
            .map(|w| page(w, "==English==\n===Noun===\n# {{gloss|a thing}}\n"))
            .collect::<String>()
            .into_bytes()
    }

    #[test]
    fn batch_parallel_processes_every_entry() {
        let input = dump(&["axe", "saw", "awl", "adze"]);
        let pipeline = test_pipeline();
        let config = ParallelConfig {
            num_threads: 2,
            batch_size: 3, // force a tail batch
            ..ParallelConfig::default()
        };

        let mut writer = BufWriter::new(Vec::new());
        let stats =
            process_batch_parallel(Cursor::new(input), &mut writer, &pipeline, &config).unwrap();

        assert_eq!(stats.pages_processed, 4);
        assert_eq!(stats.cards_written, 4);
        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(output.lines().count(), 4);
    }

    #[test]
    fn channel_pipeline_processes_every_entry() {
        let input = dump(&["axe", "saw", "awl"]);
        let pipeline = test_pipeline();
        let config = ParallelConfig {
            num_workers: 2,
            channel_buffer: 8,
            ..ParallelConfig::default()
        };

        let stats =
            process_channel_pipeline(Cursor::new(input), Vec::new(), &pipeline, &config).unwrap();

        assert_eq!(stats.pages_processed, 3);
        assert_eq!(stats.cards_written, 3);
    }
}
