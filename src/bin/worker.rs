//! Reference worker process for the process-pool backend.
//!
//! Serves the JSON line protocol on stdin/stdout with an echo analyzer that
//! returns one record per page. Failure switches make it usable as a fixture.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use page_fanout::{PageAnalyzer, PageResult, ProcessingFlags, WorkItem, logging, worker};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "page-fanout-worker",
    version,
    about = "Page analysis worker speaking the page-fanout JSON line protocol"
)]
struct Args {
    /// Fail any partition containing this page number
    #[arg(long = "fail-page", value_name = "PAGE")]
    fail_pages: Vec<usize>,

    /// Exit the process abruptly when a partition contains this page number
    #[arg(long = "exit-on-page", value_name = "PAGE")]
    exit_on_page: Option<usize>,

    /// Simulated analysis time per page
    #[arg(long, default_value_t = 0, env = "PAGE_FANOUT_WORKER_DELAY_MS")]
    delay_ms: u64,

    /// Increase log verbosity (stderr)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

struct EchoAnalyzer {
    args: Args,
}

impl PageAnalyzer for EchoAnalyzer {
    fn analyze(&mut self, items: &[WorkItem], flags: ProcessingFlags) -> Result<Vec<PageResult>> {
        if let Some(page) = self.args.exit_on_page
            && items.iter().any(|item| item.page_no == page)
        {
            tracing::error!("Exiting on page {}", page);
            std::process::exit(3);
        }

        if let Some(item) = items
            .iter()
            .find(|item| self.args.fail_pages.contains(&item.page_no))
        {
            anyhow::bail!("page {} could not be analyzed", item.page_no);
        }

        std::thread::sleep(Duration::from_millis(self.args.delay_ms * items.len() as u64));

        Ok(items
            .iter()
            .map(|item| PageResult {
                page_no: item.page_no,
                data: serde_json::json!({
                    "lang": item.meta.lang,
                    "ocr": item.meta.ocr,
                    "bytes": item.payload.len(),
                    "formula_enable": flags.formula_enable,
                    "table_enable": flags.table_enable,
                    "pid": std::process::id(),
                }),
            })
            .collect())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let factory = move || -> Result<EchoAnalyzer> {
        tracing::debug!("Worker {} building analyzer", std::process::id());
        Ok(EchoAnalyzer { args: args.clone() })
    };

    worker::serve_stdio(&factory)?;
    Ok(())
}
