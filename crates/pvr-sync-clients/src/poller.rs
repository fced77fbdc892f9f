use crate::error::PvrError;
use crate::transport::RestClient;
use pvr_sync_models::CommandState;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandStatusResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

/// Poll `GET /command/{id}` until the remote job reaches a terminal state.
///
/// `completed` is the only success. `failed` and any unrecognised status
/// stop the loop immediately; an unknown string is a protocol violation,
/// not a pending state, and retrying it would spin forever against a
/// misbehaving server. The deadline and cancellation token are deliberate
/// additions over the classic unbounded wait.
pub async fn wait_for_completion(
    rest: &RestClient,
    command_id: i64,
    interval: Duration,
    deadline: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<(), PvrError> {
    let give_up_at = deadline.map(|d| Instant::now() + d);
    let endpoint = format!("/command/{command_id}");

    loop {
        let response: CommandStatusResponse = rest.get_json(&endpoint, &[]).await?;
        let state = CommandState::parse(&response.status);
        debug!(command_id, status = %state, "command status retrieved");

        match state {
            CommandState::Completed => return Ok(()),
            CommandState::Failed | CommandState::Other(_) => {
                return Err(PvrError::RemoteJobFailed {
                    status: state.to_string(),
                    message: response.message,
                });
            }
            CommandState::Queued | CommandState::Started => {}
        }

        if let Some(give_up_at) = give_up_at {
            if Instant::now() >= give_up_at {
                return Err(PvrError::DeadlineExceeded { command_id });
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(PvrError::Cancelled { command_id }),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
