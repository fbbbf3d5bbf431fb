use crate::{Error, FeatureSet, ItemsClient, ItemsRequest, Result, SearchResults};

/// The upstream caps any single response at this many features.
const PAGE_SIZE: u64 = 100;

/// Default cap on the number of upstream requests one pagination run may
/// issue.
pub const DEFAULT_REQUEST_LIMIT: u64 = 50;

/// Pages an items search past the upstream single-response cap.
///
/// The offset cursor belongs to this wrapper: requests that set `offset`
/// themselves are rejected, and at least one of `limit` (total features)
/// and `request_limit` (total requests) must be present so a run cannot
/// page forever.
///
/// Paging stops at the request limit, at the feature limit, or when the
/// upstream stops advertising a `next` link, whichever comes first. The
/// final page's `limit` parameter is trimmed so the feature limit is hit
/// exactly.
#[derive(Clone, Debug)]
pub struct Paginated<C> {
    inner: C,
}

impl<C> Paginated<C> {
    /// Wraps a client with pagination.
    pub fn new(inner: C) -> Paginated<C> {
        Paginated { inner }
    }
}

impl<C: ItemsClient> ItemsClient for Paginated<C> {
    async fn items(&self, request: ItemsRequest) -> Result<SearchResults> {
        if request.query.offset.is_some()
            || request.query.additional_params.contains_key("offset")
        {
            return Err(Error::Validation(
                "'offset' is not a valid parameter for paginated searches; the offset \
                 cursor is owned by the pagination layer"
                    .to_string(),
            ));
        }
        if request.limit.is_none() && request.request_limit.is_none() {
            return Err(Error::Validation(
                "at least one of limit and request-limit must be provided, to bound the \
                 number of upstream requests; there is no upper bound on either value"
                    .to_string(),
            ));
        }

        // The batch plan divides the requested total by the page size; the
        // remainder is the final page's trimmed limit.
        let batch_plan = request
            .limit
            .map(|limit| (limit / PAGE_SIZE, limit % PAGE_SIZE));
        let mut features = Vec::new();
        let mut offset = 0;
        let mut request_count = 0;

        loop {
            if request.request_limit == Some(request_count) {
                break;
            }
            if let Some(limit) = request.limit {
                if offset >= limit {
                    break;
                }
            }
            let mut page_request = request.clone();
            page_request.add_metadata = false;
            page_request.query.offset = Some(offset);
            if let Some((batch_count, final_batch_size)) = batch_plan {
                if request_count == batch_count {
                    page_request.query.limit = Some(final_batch_size);
                }
            }
            let page = self.inner.items(page_request).await?.into_features()?;
            request_count += 1;
            let has_next = page.has_next_link();
            features.extend(page.features);
            if !has_next {
                break;
            }
            offset += PAGE_SIZE;
        }

        let mut set = FeatureSet::new();
        set.number_of_requests = Some(request_count);
        set.number_returned = Some(features.len() as u64);
        set.collection = request.collections.first().cloned();
        set.features = features;
        set.stamp();
        Ok(SearchResults::Features(set))
    }
}
