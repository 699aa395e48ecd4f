//! Fetch command - resolve descriptors and print bundle paths

use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::AppfetchResult;
use crate::extensions::SupportedExtensions;
use crate::fetcher::AppFetcher;
use futures_util::future::join_all;
use tracing::debug;

/// Execute the fetch command
///
/// Descriptors resolve concurrently; paths print in argument order. The
/// first failure is returned after the remaining acquisitions settle.
pub async fn execute(args: FetchArgs, config: &Config) -> AppfetchResult<()> {
    let extensions = SupportedExtensions::try_new(&args.extensions)?;
    let fetcher = AppFetcher::new(config)?;
    debug!("Working directory: {}", fetcher.work_dir().display());

    let results = join_all(
        args.descriptors
            .iter()
            .map(|descriptor| fetcher.acquire(descriptor, &extensions)),
    )
    .await;

    let mut outcome = Ok(());
    for result in results {
        match result {
            Ok(path) => println!("{}", path.display()),
            Err(e) if outcome.is_ok() => outcome = Err(e),
            Err(e) => debug!("Additional failure: {}", e),
        }
    }

    if args.sweep {
        fetcher.shutdown();
    }
    outcome
}
