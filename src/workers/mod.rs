// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 驱动采集运行的列表页遍历与详情页并发抓取
pub mod harvest_worker;

pub use harvest_worker::HarvestWorker;
