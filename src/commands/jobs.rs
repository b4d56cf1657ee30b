use anyhow::{Context, Result};
use std::sync::Arc;
use uuid::Uuid;

use fleetcrawl::config::Config;
use fleetcrawl::jobs::JobService;
use fleetcrawl::models::CrawlRequest;
use fleetcrawl::notifications::LogNotifier;
use fleetcrawl::utils::truncate_text;

use super::open_store;

fn service(config: &Config) -> Result<JobService> {
    Ok(JobService::new(open_store(config)?, Arc::new(LogNotifier)))
}

pub fn submit(config: &Config, url: String, max_depth: u32, max_pages: u32, owner: String) -> Result<()> {
    let request = CrawlRequest::new(url, owner)
        .with_max_depth(max_depth)
        .with_max_pages(max_pages);

    let job = service(config)?.submit(request).context("Submission rejected")?;

    println!("Queued job {}", job.id);
    println!("  Seed:      {}", job.seed_url);
    println!("  Max depth: {}", job.max_depth);
    println!("  Max pages: {}", job.max_pages);
    Ok(())
}

pub fn list(config: &Config, owner: Option<&str>) -> Result<()> {
    let summaries = service(config)?.summaries(owner)?;
    if summaries.is_empty() {
        println!("No jobs");
        return Ok(());
    }

    for summary in summaries {
        println!("{}", summary.display());
    }
    Ok(())
}

pub fn results(config: &Config, job_id: Uuid) -> Result<()> {
    let service = service(config)?;
    let summary = service
        .summary(job_id)?
        .with_context(|| format!("No job with id {job_id}"))?;

    println!("{}", summary.display());
    println!("{}", "=".repeat(60));

    for result in service.results(job_id)? {
        let title = result.title.as_deref().unwrap_or("-");
        let detail = result.error_message.as_deref().unwrap_or("");
        println!(
            "{:>3} {:<60} links={:<4} {} {}",
            result.status_code,
            truncate_text(&result.url, 60),
            result.link_count,
            truncate_text(title, 40),
            detail
        );
    }
    Ok(())
}
