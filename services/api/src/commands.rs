use crate::cli::{
    FeedbackArgs, HistoryExportArgs, HistoryShowArgs, ScanArgs, SettingsSetArgs, StatsArgs,
    SuggestionsArgs,
};
use crate::infra::{poll_for_changes, scoring_client, ConsoleOverlay};
use chrono::{DateTime, SecondsFormat};
use ecotide::config::AppConfig;
use ecotide::error::AppError;
use ecotide::scanner::{debounce, HtmlFileSurface, PageScanner, ScanReport};
use ecotide::stats::Stats;
use ecotide::{compute_stats, EcoStore, HistoryEvent, Settings, SettingsPatch};
use std::fs::File;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub(crate) async fn scan(config: &AppConfig, store: EcoStore, args: ScanArgs) -> Result<(), AppError> {
    let ScanArgs {
        page,
        url,
        watch,
        poll_ms,
    } = args;

    std::fs::metadata(&page)?;
    let client = Arc::new(scoring_client(config, &store)?);
    let overlay = Arc::new(ConsoleOverlay);
    let mut scanner = PageScanner::new(client, store, overlay);
    let surface = HtmlFileSurface::new(page.clone(), url);

    let report = scanner.scan(&surface).await;
    render_scan_report("Scan", &report);

    if !watch {
        return Ok(());
    }

    println!("\nWatching {} for changes (Ctrl-C to stop)", page.display());
    let mutations = poll_for_changes(page, Duration::from_millis(poll_ms.max(1)));
    let triggers = debounce(mutations, config.scanner.rescan_debounce);

    tokio::select! {
        totals = scanner.watch(&surface, triggers) => {
            render_scan_report("Rescans", &totals);
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("watch interrupted");
        }
    }

    Ok(())
}

fn render_scan_report(title: &str, report: &ScanReport) {
    println!(
        "\n{title}: {} found | {} already shown | {} cached | {} scored | {} errored",
        report.discovered, report.skipped, report.cache_hits, report.scored, report.errored
    );
    if report.overlay_failures > 0 {
        println!("{} overlay updates failed", report.overlay_failures);
    }
}

pub(crate) fn stats(store: &EcoStore, args: StatsArgs) {
    let stats = compute_stats(&store.history().all());

    if args.json {
        match serde_json::to_string_pretty(&stats.view()) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Stats payload unavailable: {err}"),
        }
        return;
    }

    render_stats(&stats);
}

fn render_stats(stats: &Stats) {
    println!("Sustainability progress");
    println!("- Products viewed: {}", stats.total_products);
    println!("- Average grade: {}", stats.average_grade_label());
    println!("- Good choices (A/B): {}", stats.good_choices);
    println!("- Estimated CO2 saved: {:.1} kg", stats.co2_saved_kg);

    if stats.badges.is_empty() {
        println!("\nBadges: none unlocked yet");
    } else {
        println!("\nBadges");
        for badge in &stats.badges {
            println!("- {}", badge.label());
        }
    }

    println!("\nGrade distribution");
    for (grade, count) in &stats.grade_distribution {
        println!("- {grade}: {count}");
    }
}

pub(crate) fn show_history(store: &EcoStore, args: HistoryShowArgs) {
    let events = store.history().all();
    if events.is_empty() {
        println!("No products viewed yet");
        return;
    }

    println!("Recent views ({} stored)", events.len());
    for event in events.iter().rev().take(args.limit) {
        println!("{}", history_line(event));
    }
}

fn history_line(event: &HistoryEvent) -> String {
    let when = DateTime::from_timestamp_millis(event.timestamp_epoch_millis)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| event.timestamp_epoch_millis.to_string());
    format!(
        "- {when} | {} | {} | {}",
        event.grade, event.co2_impact, event.product
    )
}

pub(crate) fn export_history(store: &EcoStore, args: HistoryExportArgs) -> Result<(), AppError> {
    match args.output {
        Some(path) => {
            let file = File::create(&path)?;
            let written = store.history().export_csv(file)?;
            eprintln!("Exported {written} events to {}", path.display());
        }
        None => {
            store.history().export_csv(io::stdout().lock())?;
        }
    }
    Ok(())
}

pub(crate) fn clear_history(store: &EcoStore) {
    store.history().clear();
    store.progress().clear();
    println!("History cleared");
}

pub(crate) fn clear_cache(store: &EcoStore) {
    let dropped = store.cache().len();
    store.cache().clear();
    println!("Cache cleared ({dropped} entries)");
}

pub(crate) fn show_settings(store: &EcoStore) {
    render_settings(&store.settings().get());
}

pub(crate) fn update_settings(store: &EcoStore, args: SettingsSetArgs) {
    let patch = SettingsPatch {
        notifications_enabled: args.notifications,
        auto_scan: args.auto_scan,
        api_endpoint: args.api_endpoint,
    };
    if patch.is_empty() {
        println!("Nothing to update");
        return;
    }
    render_settings(&store.settings().update(patch));
}

pub(crate) fn reset_settings(store: &EcoStore) {
    render_settings(&store.settings().reset());
}

fn render_settings(settings: &Settings) {
    println!("Settings");
    println!("- Notifications: {}", on_off(settings.notifications_enabled));
    println!("- Auto-scan: {}", on_off(settings.auto_scan));
    println!("- Scoring endpoint: {}", settings.api_endpoint);
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

pub(crate) async fn health(config: &AppConfig, store: &EcoStore) -> Result<(), AppError> {
    let client = scoring_client(config, store)?;
    let status = if client.health_check().await {
        "healthy"
    } else {
        "unavailable"
    };
    println!("Scoring service {}: {status}", client.endpoint());
    Ok(())
}

pub(crate) async fn feedback(
    config: &AppConfig,
    store: &EcoStore,
    args: FeedbackArgs,
) -> Result<(), AppError> {
    let client = scoring_client(config, store)?;
    if client
        .submit_feedback(&args.product, args.grade, &args.feedback)
        .await
    {
        println!("Feedback sent for {}", args.product);
    } else {
        println!("Feedback could not be delivered");
    }
    Ok(())
}

pub(crate) async fn suggestions(
    config: &AppConfig,
    store: &EcoStore,
    args: SuggestionsArgs,
) -> Result<(), AppError> {
    let client = scoring_client(config, store)?;
    let suggestions = client.suggestions(&args.product, &args.category).await;

    if suggestions.is_empty() {
        println!("No alternatives available for {}", args.product);
        return Ok(());
    }

    println!("Greener alternatives to {}", args.product);
    for suggestion in suggestions {
        let grade = suggestion.grade.as_deref().unwrap_or("?");
        print!("- [{grade}] {}", suggestion.title);
        if let Some(reason) = &suggestion.reason {
            print!(" ({reason})");
        }
        if let Some(url) = &suggestion.url {
            print!(" {url}");
        }
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecotide::Grade;

    #[test]
    fn history_line_renders_utc_timestamp() {
        let event = HistoryEvent {
            product: "Bamboo Toothbrush".to_string(),
            grade: Grade::A,
            co2_impact: "0.2 kg CO2".to_string(),
            timestamp_epoch_millis: 1_700_000_000_000,
        };

        assert_eq!(
            history_line(&event),
            "- 2023-11-14T22:13:20Z | A | 0.2 kg CO2 | Bamboo Toothbrush"
        );
    }

    #[test]
    fn on_off_labels() {
        assert_eq!(on_off(true), "on");
        assert_eq!(on_off(false), "off");
    }
}
