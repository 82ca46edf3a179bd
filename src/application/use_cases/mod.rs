// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 用例模块
///
/// 每个用例代表一个完整的业务流程：
/// - 采集（harvest_use_case）：一次增量采集运行
/// - 合并（concat_use_case）：跨运行去重合并
pub mod concat_use_case;
pub mod harvest_use_case;
