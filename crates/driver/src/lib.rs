pub mod callbacks;
pub mod frame_loop;
pub mod timer;
