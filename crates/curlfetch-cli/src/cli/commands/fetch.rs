//! `curlfetch fetch <url>...` – one batch, one deadline, one line per URL.

use anyhow::{Context, Result};
use curlfetch_core::{Downloader, FetchConfig, Method, Outcome, RequestOptions};
use serde::Serialize;
use std::time::Duration;

/// Arguments of the fetch command, after clap parsing.
#[derive(Debug, Clone)]
pub struct FetchArgs {
    pub urls: Vec<String>,
    pub timeout_ms: u64,
    pub method: String,
    pub headers: Vec<String>,
    pub follow_redirects: bool,
    pub max_concurrent: Option<usize>,
    pub print_body: bool,
    pub json: bool,
}

impl FetchArgs {
    fn request_options(&self) -> Result<RequestOptions> {
        let method: Method = self
            .method
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        let mut opts = RequestOptions::default()
            .method(method)
            .follow_redirects(self.follow_redirects);
        for line in &self.headers {
            let (name, value) = RequestOptions::parse_header_line(line)
                .with_context(|| format!("header {:?}", line))?;
            opts = opts.header(name, value);
        }
        Ok(opts)
    }
}

/// One printed result row.
#[derive(Debug, Serialize)]
struct OutcomeReport {
    seq: usize,
    url: String,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
}

fn report(seq: usize, url: &str, outcome: &Outcome, with_body: bool) -> OutcomeReport {
    let mut r = OutcomeReport {
        seq,
        url: url.to_string(),
        outcome: "timed_out",
        status: None,
        bytes: None,
        elapsed_ms: None,
        error: None,
        body: None,
    };
    match outcome {
        Outcome::Success(resp) => {
            r.outcome = "success";
            r.status = Some(resp.status);
            r.bytes = Some(resp.body.len());
            r.elapsed_ms = Some(resp.elapsed.as_millis() as u64);
            if with_body {
                r.body = Some(resp.body_text());
            }
        }
        Outcome::TransportError(failure) => {
            r.outcome = "transport_error";
            r.error = Some(failure.to_string());
        }
        Outcome::TimedOut => {}
    }
    r
}

fn print_text(reports: &[OutcomeReport]) {
    for r in reports {
        match r.outcome {
            "success" => println!(
                "[{}] {} -> HTTP {} ({} bytes, {} ms)",
                r.seq,
                r.url,
                r.status.unwrap_or(0),
                r.bytes.unwrap_or(0),
                r.elapsed_ms.unwrap_or(0)
            ),
            "transport_error" => println!(
                "[{}] {} -> {}",
                r.seq,
                r.url,
                r.error.as_deref().unwrap_or("transport error")
            ),
            _ => println!("[{}] {} -> timed out", r.seq, r.url),
        }
        if let Some(body) = &r.body {
            println!("{}", body);
        }
    }
}

pub async fn run_fetch(cfg: &FetchConfig, args: FetchArgs) -> Result<()> {
    let mut cfg = cfg.clone();
    if args.max_concurrent.is_some() {
        cfg.max_concurrent = args.max_concurrent;
    }
    let options = args.request_options()?;
    let downloader = Downloader::new(&cfg);
    for url in &args.urls {
        downloader
            .add_request_with(url, options.clone())
            .with_context(|| format!("add {}", url))?;
    }

    let timeout = Duration::from_millis(args.timeout_ms);
    let outcomes = tokio::task::spawn_blocking(move || downloader.fetch(timeout))
        .await
        .context("fetch task join")??;

    let reports: Vec<OutcomeReport> = outcomes
        .iter()
        .zip(&args.urls)
        .enumerate()
        .map(|(seq, (outcome, url))| report(seq, url, outcome, args.print_body))
        .collect();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_text(&reports);
    }
    Ok(())
}
