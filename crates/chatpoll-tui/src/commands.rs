//! One-shot subcommands that talk to the backend without the TUI.

use anyhow::Result;
use chatpoll_core::api::validate_traffic_request;
use chatpoll_core::state::generate_user_id;
use chatpoll_core::{ChatApiClient, ChatBackend, ChatMessage, ChatRole, Config};
use colored::*;

pub async fn history(client: &ChatApiClient, limit: Option<usize>) -> Result<()> {
    let messages = match client.history().await {
        Ok(messages) => messages,
        Err(e) => {
            println!("{}: {}", "Error fetching history".red(), e);
            println!("Is the backend running at {}?", client.base_url().bold());
            return Ok(());
        }
    };

    println!(
        "\n{}",
        format!("📜 Message log ({} messages)", messages.len()).bold().blue()
    );
    println!("{}", "=".repeat(50).dimmed());

    if messages.is_empty() {
        println!("{}", "The log is empty".yellow());
        return Ok(());
    }

    let skip = limit.map_or(0, |n| messages.len().saturating_sub(n));
    for msg in messages.iter().skip(skip) {
        println!("{}", format_message(msg));
    }

    Ok(())
}

fn format_message(msg: &ChatMessage) -> String {
    let label = match msg.role {
        ChatRole::User => "You".bold().cyan(),
        ChatRole::Assistant => "AI".bold().yellow(),
    };

    let mut header = label.to_string();
    if let Some(user_id) = &msg.meta.user_id {
        if msg.role == ChatRole::User {
            header.push_str(&format!(" {}", user_id.dimmed()));
        }
    }
    for badge in msg.meta.badges() {
        header.push_str(&format!(" {}", format!("[{}]", badge).magenta()));
    }

    format!("\n{}\n{}", header, msg.content)
}

pub async fn send(client: &ChatApiClient, prompt: &str, user_id: Option<String>) -> Result<()> {
    let user_id = user_id.unwrap_or_else(generate_user_id);
    println!("💬 Sending as {}...\n", user_id.bold().magenta());

    match client.chat(prompt, &user_id).await {
        Ok(response) => {
            println!("{}", "Response:".bold().green());
            println!("{}", response);
        }
        Err(e) => {
            println!("{}: {}", "Chat request failed".red(), e);
        }
    }

    Ok(())
}

pub async fn traffic(
    client: &ChatApiClient,
    config: &Config,
    requests: Option<u32>,
    delay: Option<u32>,
) -> Result<()> {
    let requests = requests.unwrap_or(config.traffic_requests);
    let delay = delay.unwrap_or(config.traffic_delay_secs);
    validate_traffic_request(requests)?;

    println!(
        "🚦 Requesting {} requests, {}s apart...",
        requests.to_string().bold(),
        delay.to_string().bold()
    );

    match client.generate_traffic(requests, delay).await {
        Ok(job) => {
            let estimate = u64::from(job.num_requests) * u64::from(job.delay_seconds)
                + config.traffic_grace_secs;
            println!(
                "{} {}",
                "Started:".bold().green(),
                job.message.as_deref().unwrap_or("traffic generation running")
            );
            println!(
                "Estimated completion in ~{}s (client-side estimate)",
                estimate.to_string().bold()
            );
        }
        Err(e) => {
            println!("{}: {}", "Traffic generation failed".red(), e.user_message());
        }
    }

    Ok(())
}

pub async fn health(client: &ChatApiClient) -> Result<()> {
    println!("\n{}", "🩺 Backend health".bold().blue());
    println!("{}", "=".repeat(30).dimmed());

    let report = match client.health().await {
        Ok(report) => report,
        Err(e) => {
            println!("{}: {}", "Backend unreachable".red(), e);
            return Ok(());
        }
    };

    let status = if report.is_ok() {
        report.status.green()
    } else {
        report.status.yellow()
    };
    println!("  Status:  {}", status);
    if let Some(service) = &report.service {
        println!(
            "  Service: {} {}",
            service,
            report.version.as_deref().unwrap_or("").dimmed()
        );
    }
    if let Some(env) = &report.env {
        println!("  Env:     {}", env);
    }
    if let Some(redis) = &report.redis {
        let state = if redis.connected {
            "connected".green()
        } else {
            "disconnected".red()
        };
        println!(
            "  Redis:   {} ({}:{})",
            state,
            redis.host.as_deref().unwrap_or("?"),
            redis.port.map_or_else(|| "?".to_string(), |p| p.to_string())
        );
        if let Some(error) = &redis.error {
            println!("           {}", error.dimmed());
        }
    }
    if let Some(cache) = &report.cache {
        println!(
            "  Cache:   {} hits / {} misses / {} errors ({:.2}% hit rate)",
            cache.hits, cache.misses, cache.errors, cache.hit_rate_percent
        );
    }

    Ok(())
}

pub fn show_config(config: &Config, save: bool) -> Result<()> {
    println!("\n{}", "⚙️  Effective configuration".bold().blue());
    println!("{}", "=".repeat(30).dimmed());
    println!("{}", serde_json::to_string_pretty(config)?);

    if save {
        let path = config.save()?;
        println!("\n{} {}", "Saved to".green(), path.display());
    } else if let Ok(path) = Config::get_config_path() {
        println!("\n{} {}", "Config file:".dimmed(), path.display());
    }

    Ok(())
}
