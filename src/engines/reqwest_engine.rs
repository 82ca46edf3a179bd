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

use crate::engines::traits::{EngineError, FetchRequest, FetchResponse, PageFetcher};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// 默认 User-Agent
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; harvestrs/0.1)";

/// 抓取引擎
///
/// 基于reqwest实现的HTTP抓取引擎。整个运行共用一个客户端，
/// 复用连接池与 cookie。
pub struct ReqwestEngine {
    client: reqwest::Client,
}

impl ReqwestEngine {
    /// 创建抓取引擎
    ///
    /// # 参数
    ///
    /// * `user_agent` - 请求使用的 User-Agent
    /// * `timeout` - 单个请求的超时时间
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .cookie_store(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for ReqwestEngine {
    /// 执行HTTP GET
    ///
    /// 非成功状态码同样作为响应返回，由调用方决定如何处理。
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
        let start = Instant::now();
        let response = self
            .client
            .get(&request.url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout
                } else {
                    EngineError::RequestFailed(e)
                }
            })?;

        let status_code = response.status().as_u16();
        let content = response.text().await?;

        Ok(FetchResponse {
            status_code,
            content,
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
#[path = "reqwest_engine_test.rs"]
mod tests;
