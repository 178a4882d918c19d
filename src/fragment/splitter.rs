//! Packs a logical request into budget-sized fragments.
//!
//! Items are accumulated in request order while both the running request
//! and response estimates stay within the budget. A read whose response
//! alone would exceed the budget is split into element chunks, each sent in
//! a fragment of its own. Write arrays are always expanded into one
//! fragment per element. Planning completes before any correlation id is
//! drawn, so a request that can never be sent consumes no ids.

use std::sync::Arc;

use log::debug;

use super::{
    CorrelationSource,
    Fragment,
    FragmentItem,
    SplitError,
    item::FragmentPlan,
};
use crate::{
    budget::TransportBudget,
    estimate::SizeEstimator,
    request::{LogicalRequest, RequestEntry, RequestKind},
    tag::Tag,
};

/// Tuning for [`Splitter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct SplitterConfig {
    /// Pack several scalar writes into one fragment. Some controllers only
    /// accept a single write item per message; disable for those.
    pub batch_writes: bool,
}

impl Default for SplitterConfig {
    fn default() -> Self { Self { batch_writes: true } }
}

/// Splits logical requests into fragments that fit a [`TransportBudget`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Splitter {
    config: SplitterConfig,
}

impl Splitter {
    #[must_use]
    pub const fn new(config: SplitterConfig) -> Self { Self { config } }

    #[must_use]
    pub const fn config(&self) -> &SplitterConfig { &self.config }

    /// Split `request` into fragments, drawing one id per fragment from `ids`.
    ///
    /// Fragments follow the request's tag order; chunks of one split tag
    /// follow ascending address order.
    ///
    /// # Errors
    ///
    /// Returns a configuration [`SplitError`] if some tag can never fit the
    /// budget, or [`SplitError::Exhausted`] if `ids` runs out.
    pub fn split<S>(
        &self,
        request: &LogicalRequest,
        budget: &TransportBudget,
        ids: &S,
    ) -> Result<Vec<Fragment>, SplitError>
    where
        S: CorrelationSource + ?Sized,
    {
        let plans = self.plan(request, budget)?;
        debug!(
            "split {} request of {} tags into {} fragments (max_pdu={})",
            request.kind(),
            request.len(),
            plans.len(),
            budget.max_pdu_bytes()
        );
        plans
            .into_iter()
            .map(|plan| Ok(Fragment::new(ids.allocate()?, plan)))
            .collect()
    }

    pub(crate) fn plan(
        &self,
        request: &LogicalRequest,
        budget: &TransportBudget,
    ) -> Result<Vec<FragmentPlan>, SplitError> {
        let mut planner = Planner::new(request.kind(), budget);
        for entry in request.entries() {
            match request.kind() {
                RequestKind::Read => planner.read(entry)?,
                RequestKind::Write => planner.write(entry, self.config.batch_writes)?,
            }
        }
        planner.flush();
        Ok(planner.plans)
    }
}

struct Planner {
    kind: RequestKind,
    estimator: SizeEstimator,
    max: u64,
    max_pdu: u32,
    empty_request: u64,
    empty_response: u64,
    request_bytes: u64,
    response_bytes: u64,
    items: Vec<FragmentItem>,
    plans: Vec<FragmentPlan>,
}

impl Planner {
    fn new(kind: RequestKind, budget: &TransportBudget) -> Self {
        let estimator = SizeEstimator::new(*budget.framing());
        let empty_request = estimator.empty_request(kind);
        let empty_response = estimator.empty_response(kind);
        Self {
            kind,
            estimator,
            max: u64::from(budget.max_pdu_bytes()),
            max_pdu: budget.max_pdu_bytes(),
            empty_request,
            empty_response,
            request_bytes: empty_request,
            response_bytes: empty_response,
            items: Vec::new(),
            plans: Vec::new(),
        }
    }

    fn read(&mut self, entry: &RequestEntry) -> Result<(), SplitError> {
        let tag = entry.tag();
        let request_item = self.estimator.request_item(self.kind, tag, None);
        if self.empty_request + request_item > self.max {
            return Err(SplitError::BudgetTooSmall {
                kind: self.kind,
                max_pdu: self.max_pdu,
                required: self.empty_request + request_item,
            });
        }
        let response_item = self.estimator.response_item(self.kind, tag);
        if self.empty_response + response_item > self.max {
            return self.split_read(entry, request_item);
        }
        let item = FragmentItem::new(entry.name().clone(), *tag, None);
        self.accumulate(item, request_item, response_item);
        Ok(())
    }

    /// Emit one single-item fragment per chunk of the oversized read `entry`.
    fn split_read(&mut self, entry: &RequestEntry, request_item: u64) -> Result<(), SplitError> {
        self.flush();
        let tag = entry.tag();
        let chunk = self.max_read_elements(entry)?;
        let count = tag.element_count();
        debug!(
            "read `{}` ({tag}) exceeds {} bytes; splitting into chunks of {chunk} elements",
            entry.name(),
            self.max_pdu
        );
        let mut start = 0u16;
        while start < count {
            let len = chunk.min(count - start);
            let part = narrow(entry, start, len)?;
            let response_bytes = self.empty_response
                + self
                    .estimator
                    .read_response_for(u64::from(len), tag.element_width());
            self.plans.push(FragmentPlan {
                kind: self.kind,
                items: vec![FragmentItem::new(entry.name().clone(), part, None)],
                request_bytes: self.empty_request + request_item,
                response_bytes,
            });
            start += len;
        }
        Ok(())
    }

    /// Largest element count whose padded response fits the budget alone.
    fn max_read_elements(&self, entry: &RequestEntry) -> Result<u16, SplitError> {
        let tag = entry.tag();
        let width = u64::from(tag.element_width());
        let header = u64::from(self.estimator.framing().response_item_header);
        let available = self.max.saturating_sub(self.empty_response + header);
        let mut elements = available / width;
        let fits = |n| {
            self.empty_response + self.estimator.read_response_for(n, tag.element_width())
                <= self.max
        };
        if elements > 0 && !fits(elements) {
            elements -= 1;
        }
        if elements == 0 {
            return Err(SplitError::ElementExceedsBudget {
                name: entry.name().clone(),
                tag: *tag,
                required: self.empty_response
                    + self.estimator.read_response_for(1, tag.element_width()),
                max_pdu: self.max_pdu,
            });
        }
        Ok(u16::try_from(elements).unwrap_or(u16::MAX))
    }

    fn write(&mut self, entry: &RequestEntry, batch: bool) -> Result<(), SplitError> {
        let tag = entry.tag();
        if tag.is_array() {
            self.flush();
            for index in 0..tag.element_count() {
                let part = narrow(entry, index, 1)?;
                let value = entry
                    .value()
                    .and_then(|value| value.element(usize::from(index), tag.data_type()));
                let item = FragmentItem::new(entry.name().clone(), part, value);
                let (request_item, response_item) = self.write_sizes(entry, &item)?;
                self.plans.push(FragmentPlan {
                    kind: self.kind,
                    items: vec![item],
                    request_bytes: self.empty_request + request_item,
                    response_bytes: self.empty_response + response_item,
                });
            }
            debug!(
                "write `{}` ({tag}) expanded into {} single-element fragments",
                entry.name(),
                tag.element_count()
            );
            return Ok(());
        }
        let item = FragmentItem::new(entry.name().clone(), *tag, entry.value().cloned());
        let (request_item, response_item) = self.write_sizes(entry, &item)?;
        if !batch {
            self.flush();
        }
        self.accumulate(item, request_item, response_item);
        if !batch {
            self.flush();
        }
        Ok(())
    }

    /// Request and response sizes of a write item that must fit on its own.
    fn write_sizes(
        &self,
        entry: &RequestEntry,
        item: &FragmentItem,
    ) -> Result<(u64, u64), SplitError> {
        let request_item = self
            .estimator
            .request_item(self.kind, item.tag(), item.value());
        let response_item = self.estimator.response_item(self.kind, item.tag());
        let required =
            (self.empty_request + request_item).max(self.empty_response + response_item);
        if required > self.max {
            return Err(SplitError::ElementExceedsBudget {
                name: entry.name().clone(),
                tag: *item.tag(),
                required,
                max_pdu: self.max_pdu,
            });
        }
        Ok((request_item, response_item))
    }

    fn accumulate(&mut self, item: FragmentItem, request_item: u64, response_item: u64) {
        let fits = self.request_bytes + request_item <= self.max
            && self.response_bytes + response_item <= self.max;
        if !fits {
            self.flush();
        }
        self.request_bytes += request_item;
        self.response_bytes += response_item;
        self.items.push(item);
    }

    fn flush(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.plans.push(FragmentPlan {
            kind: self.kind,
            items: std::mem::take(&mut self.items),
            request_bytes: self.request_bytes,
            response_bytes: self.response_bytes,
        });
        self.request_bytes = self.empty_request;
        self.response_bytes = self.empty_response;
    }
}

fn narrow(entry: &RequestEntry, start: u16, count: u16) -> Result<Tag, SplitError> {
    entry
        .tag()
        .narrowed(start, count)
        .map_err(|source| SplitError::Narrow {
            name: entry.name().clone(),
            source,
        })
}
