use std::fs;

use latticelab::config::CellConfig;
use latticelab::session::{Request, Response, Session};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::DaemonError;
use crate::paths::AppPaths;

/// Requests handled by the daemon itself rather than the session.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Control {
    Shutdown,
}

/// What the connection handler should do after a request line.
#[derive(Debug)]
pub enum Outcome {
    Reply(Response),
    /// Send the response, then exit the process.
    Shutdown(Response),
}

pub struct DaemonState {
    pub session: Session,
    paths: AppPaths,
}

impl DaemonState {
    /// Start from the persisted automaton config, falling back to defaults.
    pub fn new(paths: AppPaths) -> Self {
        let cfg = match load_config(&paths) {
            Ok(Some(cfg)) => {
                info!("Loaded cell config from {:?}", paths.cells_config_file());
                cfg
            }
            Ok(None) => {
                info!("No saved cell config; using defaults");
                CellConfig::default()
            }
            Err(e) => {
                warn!("Could not load cell config: {}", e);
                CellConfig::default()
            }
        };
        Self {
            session: Session::new(cfg),
            paths,
        }
    }

    pub fn save_config(&self) -> Result<(), DaemonError> {
        let path = self.paths.cells_config_file();
        let text = self.session.cell_config().to_json()?;
        fs::write(&path, text).map_err(|source| DaemonError::Io { path, source })
    }

    /// Decode and answer one request line.
    pub fn dispatch(&mut self, line: &str) -> Outcome {
        if let Ok(Control::Shutdown) = serde_json::from_str::<Control>(line) {
            return match self.save_config() {
                Ok(()) => {
                    info!("Shutdown requested; cell config saved");
                    Outcome::Shutdown(Response::Success {
                        message: "Shutting down".to_string(),
                    })
                }
                Err(e) => Outcome::Reply(Response::Error {
                    message: format!("Save failed, aborting shutdown: {}", e),
                }),
            };
        }

        let request: Request = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                return Outcome::Reply(Response::Error {
                    message: format!("Invalid request: {}", e),
                })
            }
        };

        let persist = matches!(
            request,
            Request::CellConfigSet { .. } | Request::CellPreset { .. }
        );
        let response = self.session.handle(request);
        if persist && matches!(response, Response::Config(_)) {
            if let Err(e) = self.save_config() {
                warn!("Could not save cell config: {}", e);
            }
        }
        Outcome::Reply(response)
    }
}

fn load_config(paths: &AppPaths) -> Result<Option<CellConfig>, DaemonError> {
    let path = paths.cells_config_file();
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path).map_err(|source| DaemonError::Io {
        path: path.clone(),
        source,
    })?;
    CellConfig::from_json(&text)
        .map(Some)
        .map_err(|message| DaemonError::InvalidConfig { path, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "latticelabd-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn reply(outcome: Outcome) -> Response {
        match outcome {
            Outcome::Reply(r) => r,
            Outcome::Shutdown(r) => panic!("unexpected shutdown: {r:?}"),
        }
    }

    #[test]
    fn config_changes_survive_restart() {
        let dir = scratch_dir("persist");
        let paths = AppPaths::at(dir.clone()).unwrap();

        let mut state = DaemonState::new(paths.clone());
        let resp = reply(state.dispatch(r#"{"type":"CellConfigSet","key":"age_limit","value":42}"#));
        assert!(matches!(resp, Response::Config(CellConfig { age_limit: 42, .. })));

        let restarted = DaemonState::new(paths);
        assert_eq!(restarted.session.cell_config().age_limit, 42);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn rejected_change_is_not_saved() {
        let dir = scratch_dir("reject");
        let paths = AppPaths::at(dir.clone()).unwrap();

        let mut state = DaemonState::new(paths.clone());
        let resp = reply(state.dispatch(r#"{"type":"CellConfigSet","key":"rows","value":2}"#));
        assert!(matches!(resp, Response::Error { .. }));
        assert!(!paths.cells_config_file().exists());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_config_falls_back_to_defaults() {
        let dir = scratch_dir("corrupt");
        let paths = AppPaths::at(dir.clone()).unwrap();
        fs::write(paths.cells_config_file(), "{ not json").unwrap();

        let state = DaemonState::new(paths);
        assert_eq!(*state.session.cell_config(), CellConfig::default());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn malformed_line_gets_error_response() {
        let dir = scratch_dir("malformed");
        let mut state = DaemonState::new(AppPaths::at(dir.clone()).unwrap());
        let resp = reply(state.dispatch("hello"));
        match resp {
            Response::Error { message } => assert!(message.starts_with("Invalid request")),
            other => panic!("unexpected {other:?}"),
        }
        let resp = reply(state.dispatch(r#"{"type":"CellParams"}"#));
        assert!(matches!(resp, Response::Params { ref params } if params.len() == 8));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn shutdown_saves_config() {
        let dir = scratch_dir("shutdown");
        let paths = AppPaths::at(dir.clone()).unwrap();
        let mut state = DaemonState::new(paths.clone());
        match state.dispatch(r#"{"type":"Shutdown"}"#) {
            Outcome::Shutdown(Response::Success { .. }) => {}
            other => panic!("unexpected {other:?}"),
        }
        assert!(paths.cells_config_file().exists());
        let _ = fs::remove_dir_all(dir);
    }
}
