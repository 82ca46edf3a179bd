// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 单次采集运行中列表页与详情页抓取工作的排队
pub mod work_queue;
