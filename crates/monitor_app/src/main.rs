mod config;
mod presenter;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use engine_logging::{engine_error, engine_info, engine_warn};
use monitor_core::{MonitorViewModel, PollPhase};
use monitor_engine::{MonitorHandle, ReqwestAgentApi, SessionStore};

use crate::config::{AppConfig, CONFIG_ENV, DEFAULT_CONFIG_PATH};
use crate::presenter::Presenter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config_path = env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let loaded = config::load(&config_path)?;
    let config = loaded.clone().unwrap_or_default();

    engine_logging::initialize(config.log_destination(), config.level(), &config.log_file);
    if loaded.is_none() {
        engine_warn!("No config at {:?}; using defaults", config_path);
    }

    let api = ReqwestAgentApi::new(config.api_settings()).context("building http client")?;
    let handle = MonitorHandle::spawn(
        Arc::new(api),
        SessionStore::new(config.state_dir.clone()),
        config.monitor_config(),
    );

    // The first publish happens after any persisted session was restored.
    let mut views = handle.subscribe();
    views.changed().await.context("monitor stopped during startup")?;

    if !views.borrow().has_session() {
        let Some(run) = config.run.as_ref() else {
            engine_info!("No session to resume and no run configured");
            handle.shutdown().await;
            return Ok(());
        };
        match handle.start_session(run.target.clone(), run.options()).await {
            Ok(agent_id) => engine_info!("Started run agent_id={} target={}", agent_id, run.target),
            Err(err) => {
                engine_error!("Could not start run: {}", err);
                handle.shutdown().await;
                return Err(err.into());
            }
        }
    }

    watch_until_done(&handle, &mut views, &config).await;
    handle.shutdown().await;
    Ok(())
}

async fn watch_until_done(
    handle: &MonitorHandle,
    views: &mut tokio::sync::watch::Receiver<MonitorViewModel>,
    config: &AppConfig,
) {
    let mut presenter = Presenter::default();
    let mut report_requested = false;

    loop {
        let view = views.borrow_and_update().clone();
        for line in presenter.render(&view) {
            println!("{line}");
        }

        if matches!(view.phase, PollPhase::Stopped(_)) {
            if !config.generate_report || report_finished(report_requested, &view) {
                break;
            }
            if !report_requested {
                handle.generate_report();
                report_requested = true;
            }
        }
        if view.phase == PollPhase::Idle {
            break;
        }

        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                engine_info!("Interrupted; stopping run");
                handle.stop_session();
            }
        }
    }
}

/// Finished once the view carries an id or an error for our request.
fn report_finished(requested: bool, view: &MonitorViewModel) -> bool {
    requested && view.report_settled()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_report_ends_the_wait_without_a_pending_view() {
        let before = MonitorViewModel::default();
        assert!(!report_finished(true, &before));

        let failed = MonitorViewModel {
            last_report_error: Some("report service unavailable".to_string()),
            ..MonitorViewModel::default()
        };
        assert!(report_finished(true, &failed));
        assert!(!report_finished(false, &failed));
    }

    #[test]
    fn pending_report_keeps_waiting() {
        let pending = MonitorViewModel {
            report_pending: true,
            ..MonitorViewModel::default()
        };
        assert!(!report_finished(true, &pending));

        let ready = MonitorViewModel {
            last_report_id: Some("rep-1".to_string()),
            ..MonitorViewModel::default()
        };
        assert!(report_finished(true, &ready));
    }
}
