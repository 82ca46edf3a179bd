// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod crawl_state;
pub mod crawl_stats;
pub mod listing;
pub mod offer;
