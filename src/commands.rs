//! Subcommand implementations.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, bail};
use home_server_manager::api::{ActionRequest, ComposeApi, HttpApi};
use home_server_manager::app;
use home_server_manager::cache::{CacheSettings, CacheStorage, HttpNetwork, OfflineCache};
use home_server_manager::config::Config;
use home_server_manager::logging;
use home_server_manager::model::{Action, ActionReply, Observation, StatusReport};
use home_server_manager::reconcile::{self, SyncSettings};
use home_server_manager::store::{Sequencer, SyncOutcome};
use home_server_manager::sw;
use serde_json::json;

pub fn dashboard(config: &Config, verbose: bool) -> anyhow::Result<()> {
    let log_dir = Config::log_dir()?;
    let _guard = logging::init_file(&log_dir, verbose)
        .with_context(|| format!("Failed to open log directory {}", log_dir.display()))?;
    tracing::info!(api = %config.api.base_url, "starting dashboard");

    let should_quit = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&should_quit))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&should_quit))?;

    let api = HttpApi::new(&config.api)?;
    app::run(should_quit, Arc::new(api), config).context("Dashboard terminated abnormally")
}

pub async fn services(config: &Config) -> anyhow::Result<()> {
    let api = HttpApi::new(&config.api)?;
    let services = api.list_services().await.context("Failed to list services")?;
    if services.is_empty() {
        println!("No services found.");
    }
    for service in services {
        println!("{}", service);
    }
    Ok(())
}

pub async fn status(config: &Config, service: Option<&str>, as_json: bool) -> anyhow::Result<()> {
    let api = HttpApi::new(&config.api)?;
    let report = api.fetch_status(service).await.context("Failed to fetch status")?;

    let names = match service {
        Some(name) => vec![name.to_string()],
        // services with no container only show up in the compose listing
        None => match api.list_services().await {
            Ok(mut listed) => {
                for name in report.service_names() {
                    if !listed.iter().any(|l| l == name) {
                        listed.push(name.to_string());
                    }
                }
                listed
            }
            Err(e) => {
                tracing::warn!("could not list services: {}", e.user_message());
                report.service_names().map(str::to_string).collect()
            }
        },
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status_json(&report, &names))?);
    } else {
        print_status_table(&report, &names);
    }
    Ok(())
}

pub async fn action(
    config: &Config,
    verb: &str,
    service: Option<String>,
    compose_key: Option<String>,
    no_wait: bool,
) -> anyhow::Result<()> {
    let Some(action) = Action::from_verb(verb) else {
        bail!("Unknown action '{}'", verb);
    };
    let api = HttpApi::new(&config.api)?;

    let (request, services) = match (action.is_fleet(), service) {
        (true, Some(_)) => bail!("'{}' acts on every service and takes no service name", verb),
        (false, None) => bail!("'{}' needs a service name", verb),
        (true, None) => {
            let services = api.list_services().await.context("Failed to list services")?;
            (ActionRequest::fleet(action), services)
        }
        (false, Some(service)) => {
            let key = compose_key.or_else(|| config.api.compose_key.clone());
            let request = ActionRequest::service(&service, action).with_compose_key(key);
            (request, vec![service])
        }
    };
    let target = request.service.clone().unwrap_or_else(|| "all services".to_string());

    if no_wait {
        let reply = api
            .dispatch(&request)
            .await
            .map_err(|e| anyhow::anyhow!(e.user_message()))
            .with_context(|| format!("{} {} failed", action.label(), target))?;
        println!("{}", reply.message);
        return Ok(());
    }

    eprintln!("{}", action.progress(&target));
    let settings = SyncSettings::from(&config.sync);
    let result = reconcile::run_action(&api, &Sequencer::default(), &settings, &request, &services).await;

    let reply = result
        .reply
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .with_context(|| format!("{} {} failed", action.label(), target))?;
    if !reply.message.is_empty() {
        println!("{}", reply.message);
    }
    if let Some(summary) = pull_summary(&reply) {
        println!("{}", summary);
    }

    match &result.outcome {
        SyncOutcome::Report { report, .. } => print_status_table(report, &services),
        SyncOutcome::Failed { message, .. } => eprintln!("Could not confirm status: {}", message),
    }
    if !result.converged {
        eprintln!("Expected state not observed after {} checks.", result.polls);
    }
    Ok(())
}

pub fn service_worker(config: &Config, out: &Path) -> anyhow::Result<()> {
    let path = sw::write_service_worker(&CacheSettings::from(&config.cache), out)?;
    println!("Service worker generated at {}", path.display());
    Ok(())
}

pub fn offline_cache(config: &Config, origin: &str) -> anyhow::Result<OfflineCache<HttpNetwork>> {
    let storage = CacheStorage::new(config.cache_dir()?);
    let network = HttpNetwork::new(origin)?;
    Ok(OfflineCache::new(CacheSettings::from(&config.cache), storage, network))
}

pub async fn cache_install(cache: &OfflineCache<HttpNetwork>) -> anyhow::Result<()> {
    let report = cache.install().await?;
    for asset in &report.cached {
        println!("cached   {}", asset);
    }
    for (asset, reason) in &report.skipped {
        println!("skipped  {} ({})", asset, reason);
    }
    Ok(())
}

pub fn cache_activate(cache: &OfflineCache<HttpNetwork>) -> anyhow::Result<()> {
    let deleted = cache.activate()?;
    if deleted.is_empty() {
        println!("No stale caches.");
    }
    for name in deleted {
        println!("deleted  {}", name);
    }
    Ok(())
}

pub async fn cache_fetch(cache: &OfflineCache<HttpNetwork>, path: &str) -> anyhow::Result<()> {
    let served = cache.fetch(&reqwest::Method::GET, path).await?;
    eprintln!("{} {} ({} bytes, from {})", served.status(), path, served.body().len(), served.source());
    std::io::stdout().write_all(served.body())?;
    Ok(())
}

pub fn cache_list(cache: &OfflineCache<HttpNetwork>) -> anyhow::Result<()> {
    let storage = cache.storage();
    let names = storage.names()?;
    if names.is_empty() {
        println!("No caches under {}", storage.root().display());
    }
    for name in names {
        let marker = if name == cache.settings().name { "*" } else { " " };
        println!("{} {}", marker, name);
        for key in storage.keys(&name)? {
            println!("    {}", key);
        }
    }
    Ok(())
}

/// What a pull did, for replies that say so.
fn pull_summary(reply: &ActionReply) -> Option<&'static str> {
    match (reply.image_updated?, reply.was_running) {
        (true, Some(true)) => Some("A newer image was pulled and the service recreated."),
        (true, _) => Some("A newer image was pulled."),
        (false, _) => Some("Image already up to date."),
    }
}

fn print_status_table(report: &StatusReport, names: &[String]) {
    println!("{:<20} {:<12} {:<28} {}", "SERVICE", "STATE", "STATUS", "SIZE");
    for name in names {
        match report.observation_for(name) {
            Observation::Present(c) => println!(
                "{:<20} {:<12} {:<28} {}",
                name,
                c.state_label,
                c.status,
                c.size.as_deref().unwrap_or("N/A")
            ),
            Observation::Failed(message) => println!("{:<20} {:<12} {}", name, "ERROR", message),
            _ => println!("{:<20} {:<12}", name, "DOWN"),
        }
    }
}

fn status_json(report: &StatusReport, names: &[String]) -> serde_json::Value {
    let services: Vec<serde_json::Value> = names
        .iter()
        .map(|name| match report.observation_for(name) {
            Observation::Present(c) => json!({
                "service": name,
                "state": c.state_label,
                "status": c.status,
                "size": c.size,
                "container": c.name,
                "ports": c.ports.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
            }),
            Observation::Failed(message) => json!({ "service": name, "error": message }),
            _ => json!({ "service": name, "state": null }),
        })
        .collect();
    json!({ "services": services })
}
