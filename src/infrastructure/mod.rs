// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节，负责与外部系统的交互。
///
/// 包含的子模块：
/// - 批次存储（batch_store）：房源批次的命名、读写与最新日期查询
/// - 指标（metrics）：Prometheus 导出器
/// - 存储（storage）：本地文件系统、S3 与内存存储实现
///
/// 基础设施层依赖于领域层的抽象接口。
pub mod batch_store;
pub mod metrics;
pub mod storage;
