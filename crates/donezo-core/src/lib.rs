pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod editor;
pub mod error;
pub mod filter;
pub mod render;
pub mod seed;
pub mod store;
pub mod task;

use std::ffi::OsString;
use std::io::IsTerminal;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info,
  warn
};

pub use error::{
  TaskError,
  TaskResult
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting donezo"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let zone = datetime::Zone::resolve(
    cfg.get_nonempty("timezone").as_deref()
  );
  let now = Utc::now();

  let seed = match cli
    .seed
    .clone()
    .or_else(|| cfg.seed_file())
  {
    | Some(path) => {
      seed::load_seed_file(
        &path, &zone, now
      )?
    }
    | None => seed::Seed::sample(now)
  };

  let mut store = store::TaskStore::new(
    seed,
    zone,
    datetime::Clock::System
  )
  .context(
    "failed to build task store from \
     initial data"
  )?;

  let initial_filter = cli
    .filter
    .clone()
    .or_else(|| cfg.get("default.filter"))
    .unwrap_or_else(|| "all".to_string());
  if let Err(err) =
    store.set_filter_str(&initial_filter)
  {
    warn!(
      error = %err,
      "starting with an empty view"
    );
  }

  if let Some(search) = cli
    .search
    .clone()
    .or_else(|| {
      cfg.get_nonempty("default.search")
    })
  {
    store.set_search(search);
  }

  let renderer =
    render::Renderer::new(&cfg)?;
  let stdout = std::io::stdout();
  let mut out = stdout.lock();

  if cli.rest.is_empty() {
    let stdin = std::io::stdin();
    let prompt = stdin.is_terminal();
    commands::run_session(
      &mut store,
      &renderer,
      stdin.lock(),
      &mut out,
      prompt
    )?;
  } else {
    let tokens: Vec<String> = cli
      .rest
      .iter()
      .map(|arg| {
        arg.to_string_lossy().to_string()
      })
      .collect();
    commands::dispatch(
      &mut store,
      &renderer,
      &mut out,
      &tokens
    )?;
  }

  info!("done");
  Ok(())
}
