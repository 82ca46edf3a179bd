// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 编排领域服务、工作器与存储，完成采集与合并两个流程
pub mod use_cases;
