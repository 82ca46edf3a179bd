// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：采集状态、房源记录与运行计数
/// - 仓库接口（repositories）：存储抽象接口
/// - 服务（services）：日期窗口、页面解析、提取与去重
///
/// 领域层不依赖于任何外部实现。
pub mod models;
pub mod repositories;
pub mod services;
