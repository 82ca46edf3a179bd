// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::engines::traits::{EngineError, FetchRequest, FetchResponse, PageFetcher};
use crate::utils::retry_policy::RetryPolicy;

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// 带限流与重试的抓取器
///
/// 包装任意 [`PageFetcher`]：
/// - 全局信号量限制同时进行的请求数
/// - 令牌桶限制每秒请求数
/// - 可重试错误按 [`RetryPolicy`] 退避重试
///
/// 非 2xx 响应会转换为 [`EngineError::HttpStatus`]，因此成功返回的响应都是可解析的页面。
pub struct RetryingFetcher {
    inner: Arc<dyn PageFetcher>,
    policy: RetryPolicy,
    limiter: Option<Arc<DirectRateLimiter>>,
    permits: Arc<Semaphore>,
}

impl RetryingFetcher {
    /// 创建抓取器
    ///
    /// # 参数
    ///
    /// * `inner` - 实际执行请求的引擎
    /// * `policy` - 重试策略
    /// * `max_concurrency` - 同时进行的最大请求数（至少为 1）
    /// * `requests_per_second` - 每秒请求上限，`None` 表示不限速
    pub fn new(
        inner: Arc<dyn PageFetcher>,
        policy: RetryPolicy,
        max_concurrency: usize,
        requests_per_second: Option<NonZeroU32>,
    ) -> Self {
        Self {
            inner,
            policy,
            limiter: requests_per_second
                .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps)))),
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    async fn attempt(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| EngineError::Other(format!("request budget closed: {}", e)))?;

        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let response = self.inner.fetch(request).await?;
        if !response.is_success() {
            return Err(EngineError::HttpStatus {
                status: response.status_code,
                url: request.url.clone(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl PageFetcher for RetryingFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
        let mut retries = 0;
        loop {
            match self.attempt(request).await {
                Ok(response) => {
                    debug!(
                        "Fetched {} ({} ms, {} retries)",
                        request.url, response.response_time_ms, retries
                    );
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && self.policy.should_retry(retries) => {
                    retries += 1;
                    let backoff = self.policy.calculate_backoff(retries);
                    warn!(
                        "Fetch of {} failed ({}), retry {}/{} in {:?}",
                        request.url, e, retries, self.policy.max_retries, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// 按顺序返回预设状态码的抓取器
    struct ScriptedFetcher {
        statuses: Vec<u16>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, _request: &FetchRequest) -> Result<FetchResponse, EngineError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            let status_code = self.statuses[call.min(self.statuses.len() - 1)];
            Ok(FetchResponse {
                status_code,
                content: "<html></html>".to_string(),
                response_time_ms: 1,
            })
        }
    }

    fn fetcher(statuses: Vec<u16>, max_retries: u32) -> (Arc<ScriptedFetcher>, RetryingFetcher) {
        let inner = Arc::new(ScriptedFetcher {
            statuses,
            calls: AtomicU32::new(0),
        });
        let retrying = RetryingFetcher::new(
            inner.clone(),
            RetryPolicy::new(max_retries, Duration::from_millis(1)),
            2,
            None,
        );
        (inner, retrying)
    }

    #[tokio::test]
    async fn test_retries_server_errors_until_success() {
        let (inner, retrying) = fetcher(vec![503, 500, 200], 3);
        let response = retrying.fetch(&FetchRequest::new("https://x/")).await.unwrap();
        assert_eq!(response.status_code, 200);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let (inner, retrying) = fetcher(vec![502], 2);
        let result = retrying.fetch(&FetchRequest::new("https://x/")).await;
        assert!(matches!(
            result,
            Err(EngineError::HttpStatus { status: 502, .. })
        ));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let (inner, retrying) = fetcher(vec![404, 200], 3);
        let result = retrying.fetch(&FetchRequest::new("https://x/")).await;
        assert!(matches!(
            result,
            Err(EngineError::HttpStatus { status: 404, .. })
        ));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_fetcher_still_fetches() {
        let inner = Arc::new(ScriptedFetcher {
            statuses: vec![200],
            calls: AtomicU32::new(0),
        });
        let retrying = RetryingFetcher::new(
            inner.clone(),
            RetryPolicy::none(),
            1,
            NonZeroU32::new(100),
        );
        for _ in 0..3 {
            retrying.fetch(&FetchRequest::new("https://x/")).await.unwrap();
        }
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }
}
