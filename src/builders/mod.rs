//! # 构建器模块
//!
//! - `splice` - 结果容器的构建、插入和清除

pub mod splice;

pub use splice::{
    build_result_container, clear_markers, splice_result, RESULT_CONTAINER_STYLE,
    RESULT_MARKER_CLASS,
};
