//! Incremental-load loop: scroll, pause, re-count until loading settles.

use std::time::Duration;

use serde::Serialize;

use crate::browser::{BrowserResult, BrowserSession, ScrollTarget};

/// Why the loading loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A round added no candidates.
    Stable,
    /// The visible count reached the requested limit.
    LimitReached,
    /// The round cap was hit while content was still arriving.
    RoundCap,
}

/// Outcome of [`load_until_stable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Candidates visible when the loop stopped.
    pub measured: usize,
    /// Rounds actually performed.
    pub rounds: u32,
    pub stop: StopReason,
}

/// Repeatedly scroll `target`, wait `delay`, and count `candidates`.
///
/// Stops at the first round where the count reaches `limit`, where the
/// count is unchanged from the previous round, or after `max_rounds`.
/// The previous count starts at zero, so an empty page stops after one
/// round.
pub async fn load_until_stable(
    session: &mut dyn BrowserSession,
    target: &ScrollTarget,
    candidates: &str,
    delay: Duration,
    max_rounds: u32,
    limit: Option<usize>,
) -> BrowserResult<LoadReport> {
    tracing::info!("Scrolling to load listings...");
    let mut previous = 0;

    for round in 1..=max_rounds {
        session.scroll(target).await?;
        tokio::time::sleep(delay).await;

        let measured = session.count(candidates).await?;
        tracing::info!("Scroll {round}/{max_rounds}: {measured} listings visible");

        if limit.is_some_and(|limit| measured >= limit) {
            tracing::info!("Stopping scroll early at {measured} listings");
            return Ok(LoadReport {
                measured,
                rounds: round,
                stop: StopReason::LimitReached,
            });
        }
        if measured == previous {
            tracing::info!("No new listings loaded, stopping scroll");
            return Ok(LoadReport {
                measured,
                rounds: round,
                stop: StopReason::Stable,
            });
        }
        previous = measured;
    }

    let measured = if max_rounds == 0 {
        session.count(candidates).await?
    } else {
        previous
    };
    tracing::info!("Scroll cap of {max_rounds} rounds reached with {measured} listings");
    Ok(LoadReport {
        measured,
        rounds: max_rounds,
        stop: StopReason::RoundCap,
    })
}
