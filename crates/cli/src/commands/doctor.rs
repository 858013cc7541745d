use pestpro_api::HttpBackend;
use pestpro_core::config::{AppConfig, LoadOptions};
use pestpro_core::store::KeyValueStore;
use serde::Serialize;

use crate::commands::{open_store, CommandResult, EXIT_CONFIG, EXIT_RUNTIME};

const STORE_PROBE_KEY: &str = "pestpro_doctor_probe";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Prints the report as-is (JSON with `--json`). Exits 0 only when every
/// check passes; a config failure exits 2, any other failure exits 3.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = report.exit_code();

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

impl DoctorReport {
    fn exit_code(&self) -> u8 {
        let failed = |name: &str| {
            self.checks.iter().any(|check| check.name == name && check.status == CheckStatus::Fail)
        };
        if failed("config_validation") {
            EXIT_CONFIG
        } else if self.overall_status == CheckStatus::Fail {
            EXIT_RUNTIME
        } else {
            0
        }
    }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => {
                    checks.push(runtime.block_on(check_store_access(&config)));
                    checks.push(runtime.block_on(check_backend_reachability(&config)));
                }
                Err(error) => {
                    for name in ["store_access", "backend_reachability"] {
                        checks.push(DoctorCheck {
                            name,
                            status: CheckStatus::Fail,
                            details: format!("failed to initialize async runtime: {error}"),
                        });
                    }
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["store_access", "backend_reachability"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

async fn check_store_access(config: &AppConfig) -> DoctorCheck {
    let store = open_store(config);
    let result = match store.set(STORE_PROBE_KEY, "ok".to_string()).await {
        Ok(()) => store.remove(STORE_PROBE_KEY).await,
        Err(error) => Err(error),
    };

    match result {
        Ok(()) => DoctorCheck {
            name: "store_access",
            status: CheckStatus::Pass,
            details: format!("store at `{}` is writable", config.store.path.display()),
        },
        Err(error) => DoctorCheck {
            name: "store_access",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

async fn check_backend_reachability(config: &AppConfig) -> DoctorCheck {
    let probe = match HttpBackend::from_config(&config.api) {
        Ok(backend) => backend.probe().await,
        Err(error) => Err(error),
    };

    match probe {
        Ok(status) => DoctorCheck {
            name: "backend_reachability",
            status: CheckStatus::Pass,
            details: format!("{} answered with HTTP {status}", config.api.base_url),
        },
        Err(error) => DoctorCheck {
            name: "backend_reachability",
            status: CheckStatus::Fail,
            details: format!("{} is unreachable: {error}", config.api.base_url),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];
    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Skipped => "SKIP",
        };
        lines.push(format!("[{marker}] {}: {}", check.name, check.details));
    }
    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
