// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub(crate) const HOTSET_NAME: &str = "hotset.name";

pub(crate) const HOTSET_OPERATION_NAME: &str = "hotset.operation";

pub(crate) const HOTSET_ACTIVITY_NAME: &str = "hotset.activity";

#[cfg(test)]
pub(crate) const HOTSET_DURATION_NAME: &str = "hotset.duration_ns";

#[cfg(test)]
pub(crate) const HOTSET_REASON_NAME: &str = "hotset.reason";

#[cfg(test)]
pub(crate) const HOTSET_EVENT_NAME: &str = "hotset.event";
