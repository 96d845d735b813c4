// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loop-level analysis on top of pairwise transfer entropy or partial
//! correlation: gain matrices over a connection topology, windowing and
//! eigenvector ranking.

pub mod gain_matrix;
pub mod ranking;
pub mod windows;

pub use gain_matrix::{
    ConnectionMatrix, EdgeDiagnostics, GainMatrix, GainMatrixReport, PairFailure,
    PairFailurePolicy, build_gain_matrix, build_partial_correlation_gain_matrix,
};
pub use ranking::{
    GainRanking, Ranking, TransientImportance, TransientRanking, backward_transition,
    blended_ranking, calculate_rank, forward_transition, rank_gain_matrix, rank_windows,
    transient_importance,
};
pub use windows::{split_windows, window_starts};
