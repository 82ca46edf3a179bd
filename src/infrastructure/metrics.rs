// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::describe_counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use tracing::info;

/// 安装 Prometheus 导出器并注册采集指标
///
/// # 参数
///
/// * `addr` - 导出器监听地址
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

/// 注册指标说明
pub fn describe_metrics() {
    describe_counter!(
        "harvest_paginations_followed_total",
        "Listing pages reached through a next-page link"
    );
    describe_counter!(
        "harvest_buckets_advanced_total",
        "Price buckets entered after the previous bucket was exhausted"
    );
    describe_counter!(
        "harvest_offers_followed_total",
        "Offer detail pages fetched"
    );
    describe_counter!(
        "harvest_offers_extracted_total",
        "Offer records produced"
    );
    describe_counter!(
        "harvest_offers_no_price_total",
        "Offer pages skipped because they carry no price"
    );
    describe_counter!(
        "harvest_offers_skipped_total",
        "Offer pages skipped, labelled by reason"
    );
    describe_counter!(
        "harvest_listing_refs_unparsed_total",
        "Listing entries dropped for an unreadable date or link"
    );
    describe_counter!(
        "harvest_pages_failed_total",
        "Pages whose fetch failed after retries"
    );
    describe_counter!(
        "harvest_records_merged_total",
        "Records written by the concatenation stage"
    );
}
