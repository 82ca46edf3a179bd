// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 测试主模块
///
/// 集成测试：基于模拟站点的完整采集运行，以及批次合并
mod integration;
