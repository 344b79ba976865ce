// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use tick::Clock;

/// Output of a future together with how long it took on the clock.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Timed<R> {
    pub value: R,
    pub elapsed: Duration,
}

pub(crate) async fn timed<F: Future>(clock: &Clock, future: F) -> Timed<F::Output> {
    let stopwatch = clock.stopwatch();
    let value = future.await;

    Timed {
        value,
        elapsed: stopwatch.elapsed(),
    }
}
