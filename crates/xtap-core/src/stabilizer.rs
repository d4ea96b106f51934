// Xtap Layout Group Stabilizer
// Re-asserts the intended keyboard layout group after every genuine event

use log::debug;

use crate::backend::{BackendResult, LayoutControl};

/// Tracks the intended vs. observed keyboard layout group.
///
/// Synthetic key sequences can be misread by other layout-switching logic as
/// a layout-changing chord. After every genuinely observed event the
/// stabilizer forces the group back to what it believes is correct, while
/// still adopting real external layout switches as the new target.
#[derive(Debug)]
pub struct GroupStabilizer {
    /// The group this engine believes should be active
    intended: u8,
    /// The group seen on the previous processed genuine event
    previous: u8,
}

impl GroupStabilizer {
    /// Create a stabilizer from the group observed at startup
    pub fn new(initial_group: u8) -> Self {
        Self {
            intended: initial_group,
            previous: initial_group,
        }
    }

    /// The group currently being re-asserted
    pub fn intended_group(&self) -> u8 {
        self.intended
    }

    /// Called once per genuine (non-echoed) event. A group change driven
    /// from outside (e.g. a user-initiated layout switch) is adopted as the
    /// new target; the target is then unconditionally re-locked and the live
    /// group re-queried as the new reference point.
    pub fn observe(&mut self, layout: &mut dyn LayoutControl) -> BackendResult<()> {
        let current = layout.current_group()?;
        if current != self.previous {
            self.intended = current;
            debug!("layout group changed to {}", current);
        }
        layout.lock_group(self.intended)?;
        self.previous = layout.current_group()?;
        Ok(())
    }
}
