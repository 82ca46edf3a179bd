// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 采集与合并两个用例
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含采集状态、房源记录以及日期窗口、解析、去重等领域服务
pub mod domain;

/// 引擎模块
///
/// 页面抓取引擎及其重试、限流包装
pub mod engines;

/// 基础设施模块
///
/// 提供存储后端、批次文件与指标导出
pub mod infrastructure;

/// 队列模块
///
/// 单次运行内的待抓取页面队列
pub mod queue;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 驱动一次采集运行的工作器
pub mod workers;
