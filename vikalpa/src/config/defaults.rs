//! Default value functions for serde deserialization.

pub fn version() -> u32 {
    1
}

pub fn robot_diameter() -> f32 {
    0.4
}

pub fn max_path_attempts() -> u32 {
    1000
}

pub fn max_waypoint_samples() -> u32 {
    100
}

pub fn obstacle_attempts_per_obstacle() -> u32 {
    1000
}

pub fn max_distribution_redraws() -> u32 {
    1000
}

pub fn path_length_tolerance() -> f32 {
    0.5
}

pub fn num_goal_poses() -> usize {
    1
}

pub fn num_paths() -> usize {
    1
}

pub fn count() -> usize {
    1
}
