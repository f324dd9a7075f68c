mod idle_sweep;

pub use idle_sweep::spawn_idle_sweep;
