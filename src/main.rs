//! # Courier: due-time scheduling and delivery
//!
//! Wires the configured producers, content source, and notifiers into an
//! engine and runs it until interrupted.
//!
//! Usage:
//!   courier                          # Use ~/.courier/config.toml
//!   courier --config ./courier.toml  # Custom config
//!   courier --check                  # Validate the config and exit

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use courier_channels::{
    FetchSource, FileSource, LogNotifier, PeriodicProducer, TemplateSource, Trigger,
    WebhookNotifier, WebhookProducer,
};
use courier_core::config::{ContentConfig, CourierConfig, JobConfig, NotifierConfig};
use courier_core::traits::{ContentSource, Notifier, Producer};
use courier_core::types::{Recipient, Requested};
use courier_scheduler::Engine;

type CourierEngine = Engine<Requested<Recipient>, Recipient, String>;

#[derive(Parser)]
#[command(
    name = "courier",
    version,
    about = "📬 Courier: schedule and deliver notifications"
)]
struct Cli {
    /// Config file (default: ~/.courier/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Validate the config and exit
    #[arg(long)]
    check: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

fn load_config(path: Option<&str>) -> Result<CourierConfig> {
    let config = match path {
        Some(path) => CourierConfig::load_from(std::path::Path::new(&expand_path(path)))?,
        None => CourierConfig::load()?,
    };
    config.validate()?;
    Ok(config)
}

fn job_producer(job: &JobConfig) -> Result<Box<dyn Producer<Requested<Recipient>>>> {
    let trigger = match (&job.cron, job.every_secs) {
        (Some(cron), _) => Trigger::cron(cron),
        (None, Some(secs)) => Trigger::every(Duration::from_secs(secs)),
        (None, None) => anyhow::bail!("job '{}': missing trigger", job.name),
    }
    .with_context(|| format!("job '{}'", job.name))?;

    let producer = PeriodicProducer::recipients(
        trigger,
        job.recipients.clone(),
        Duration::from_secs(job.delay_secs),
    )
    .named(&job.name);
    Ok(Box::new(producer))
}

fn content_source(content: &ContentConfig) -> Result<Box<dyn ContentSource<Recipient, String>>> {
    Ok(match (content.kind.as_str(), &content.path, &content.url) {
        ("file", Some(path), _) => Box::new(FileSource::open(expand_path(path))?),
        ("fetch", _, Some(url)) => Box::new(FetchSource::<Recipient>::new(url.as_str())),
        _ => Box::new(TemplateSource::new(content.template.as_str())),
    })
}

fn notifier(config: &NotifierConfig) -> Box<dyn Notifier<Recipient, String>> {
    match (config.kind.as_str(), &config.url) {
        ("webhook", Some(url)) => {
            let mut notifier = WebhookNotifier::new(url.as_str())
                .timeout(Duration::from_secs(config.timeout_secs));
            for (name, value) in &config.headers {
                notifier = notifier.header(name.as_str(), value.as_str());
            }
            if let Some(channel) = &config.channel {
                notifier = notifier.for_channel(channel.as_str());
            }
            Box::new(notifier)
        }
        _ => match &config.channel {
            Some(channel) => Box::new(LogNotifier::for_channel(channel.as_str())),
            None => Box::new(LogNotifier::new()),
        },
    }
}

fn build_engine(config: &CourierConfig) -> Result<CourierEngine> {
    let mut producers = config
        .jobs
        .iter()
        .map(job_producer)
        .collect::<Result<Vec<_>>>()?;

    if config.webhook.enabled {
        let addr = WebhookProducer::<Requested<Recipient>>::parse_addr(
            &config.webhook.host,
            config.webhook.port,
        )?;
        producers.push(Box::new(WebhookProducer::<Requested<Recipient>>::new(addr)));
    }

    let engine = Engine::builder()
        .producers(producers)
        .due_time_schedule()
        .content_sources([content_source(&config.content)?])
        .notifiers(config.notifiers.iter().map(notifier))
        .build()?;
    Ok(engine)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "courier=debug,courier_core=debug,courier_scheduler=debug,courier_channels=debug"
    } else {
        "courier=info,courier_core=info,courier_scheduler=info,courier_channels=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = load_config(cli.config.as_deref()).context("invalid configuration")?;
    let engine = build_engine(&config)?;

    if cli.check {
        println!(
            "✅ Config OK: {} producers, {} notifiers",
            engine.producer_count(),
            config.notifiers.len()
        );
        return Ok(());
    }

    tracing::info!("📬 Courier v{}", env!("CARGO_PKG_VERSION"));
    if config.engine.isolated_producers {
        tokio::select! {
            result = engine.run_isolated() => result?,
            _ = tokio::signal::ctrl_c() => tracing::info!("🛑 Interrupted"),
        }
    } else {
        tokio::select! {
            _ = engine.run() => {}
            _ = tokio::signal::ctrl_c() => tracing::info!("🛑 Interrupted"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> CourierConfig {
        let config = CourierConfig::parse(toml).unwrap();
        config.validate().unwrap();
        config
    }

    #[tokio::test]
    async fn test_builds_engine_from_config() {
        let config = parse(
            r#"
            [[jobs]]
            name = "morning"
            cron = "0 8 * * *"
            recipients = [{ name = "alice" }, { name = "bob", channel = "ops" }]

            [[jobs]]
            name = "heartbeat"
            every_secs = 60
            recipients = [{ name = "carol" }]

            [webhook]
            enabled = true
            port = 0

            [[notifiers]]
            kind = "webhook"
            channel = "ops"
            url = "http://localhost:9000/hook"
            headers = [["Authorization", "Bearer x"]]

            [[notifiers]]
            kind = "log"
            "#,
        );
        let engine = build_engine(&config).unwrap();
        assert_eq!(engine.producer_count(), 3);
    }

    #[tokio::test]
    async fn test_bad_cron_is_reported_with_job_name() {
        let config = parse(
            r#"
            [[jobs]]
            name = "broken"
            cron = "99 * * * *"
            recipients = [{ name = "alice" }]

            [[notifiers]]
            kind = "log"
            "#,
        );
        let err = build_engine(&config).err().unwrap();
        assert!(format!("{err:#}").contains("broken"));
    }

    #[tokio::test]
    async fn test_template_content_from_config() {
        let source = content_source(&ContentConfig {
            template: "Hi {name} on {channel}".into(),
            ..ContentConfig::default()
        })
        .unwrap();
        let content = source
            .get_content(&Recipient::on_channel("dana", "sms"))
            .await
            .unwrap();
        assert_eq!(content, "Hi dana on sms");
    }

    #[test]
    fn test_missing_file_content_fails() {
        let result = content_source(&ContentConfig {
            kind: "file".into(),
            path: Some("/no/such/file.txt".into()),
            ..ContentConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from(["courier", "--config", "~/c.toml", "--check", "-v"]);
        assert_eq!(cli.config.as_deref(), Some("~/c.toml"));
        assert!(cli.check && cli.verbose);
    }
}
