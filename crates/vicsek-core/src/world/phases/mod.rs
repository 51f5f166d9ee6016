mod integrate;
mod sensing;

#[cfg(test)]
pub(in crate::world) use sensing::circular_mean;
