// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 采集流程中不涉及网络与存储的纯逻辑：
/// - 日期窗口解析（date_window）
/// - 列表页地址构造与解析（listing_urls、listing_parser）
/// - 详情页提取（offer_extractor），以及其使用的波兰语日期与数值解析
/// - 跨批次去重（dedup）
pub mod date_window;
pub mod dedup;
pub mod listing_parser;
pub mod listing_urls;
pub mod locale_date;
pub mod numeric;
pub mod offer_extractor;
