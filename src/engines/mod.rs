// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 抓取引擎模块
///
/// - 特质与错误（traits）
/// - reqwest 引擎（reqwest_engine）
/// - 限流与重试包装（retrying_fetcher）
pub mod reqwest_engine;
pub mod retrying_fetcher;
pub mod traits;
