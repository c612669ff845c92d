use std::io;

use tracing::{error, info, warn};

use crate::control_table::ControlTable;
use crate::keyboard::{Key, KeySource};
use crate::DynamixelDriver;

pub const DEFAULT_ID: u8 = 1;
pub const DEFAULT_GOALS: [i32; 2] = [10, 4000];
pub const DEFAULT_STEP: i32 = 100;
pub const DEFAULT_THRESHOLD: i32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JogSettings {
    pub id: u8,
    pub table: ControlTable,
    /// Two goal targets; only the selected one is adjusted and written.
    pub goals: [i32; 2],
    /// Goal change per `a`/`s` key press.
    pub step: i32,
    /// Largest goal/present distance still counted as settled.
    pub threshold: i32,
    /// Switch to the other goal after every move.
    pub alternate_goals: bool,
}

impl Default for JogSettings {
    fn default() -> Self {
        JogSettings {
            id: DEFAULT_ID,
            table: ControlTable::default(),
            goals: DEFAULT_GOALS,
            step: DEFAULT_STEP,
            threshold: DEFAULT_THRESHOLD,
            alternate_goals: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalPositions {
    targets: [i32; 2],
    index: usize,
}

impl GoalPositions {
    pub fn new(targets: [i32; 2]) -> GoalPositions {
        GoalPositions { targets, index: 0 }
    }

    pub fn current(&self) -> i32 {
        self.targets[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn adjust(&mut self, delta: i32) {
        self.targets[self.index] = self.targets[self.index].saturating_add(delta);
    }

    pub fn toggle(&mut self) {
        self.index = 1 - self.index;
    }
}

/// How a wait for the servo to reach its goal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Settled { present: u32 },
    BelowRange,
    AboveRange,
}

pub struct JogController {
    driver: DynamixelDriver,
    settings: JogSettings,
    goals: GoalPositions,
}

impl JogController {
    pub fn new(driver: DynamixelDriver, settings: JogSettings) -> JogController {
        let goals = GoalPositions::new(settings.goals);
        JogController {
            driver,
            settings,
            goals,
        }
    }

    pub fn goals(&self) -> &GoalPositions {
        &self.goals
    }

    pub fn into_driver(self) -> DynamixelDriver {
        self.driver
    }

    /// Enables torque, jogs until a quit key, then disables torque.
    ///
    /// Bus errors are logged and the loop carries on. Only a failure to read
    /// the keyboard ends the run early, and torque is still disabled then.
    pub async fn run<K: KeySource + ?Sized>(&mut self, keys: &mut K) -> io::Result<()> {
        if self.write_torque(true).await {
            info!("Dynamixel has been successfully connected");
        }
        let result = self.jog(keys).await;
        self.write_torque(false).await;
        result
    }

    async fn jog<K: KeySource + ?Sized>(&mut self, keys: &mut K) -> io::Result<()> {
        loop {
            println!("Press 'a' motor rotate+{}", self.settings.step);
            println!("Press 's' motor rotate-{}", self.settings.step);
            println!("Press 'esc' exit program");
            match keys.next_key().await? {
                Key::Increase => self.goals.adjust(self.settings.step),
                Key::Decrease => self.goals.adjust(-self.settings.step),
                Key::Quit => return Ok(()),
                Key::Other => {}
            }

            let goal = self.goals.current();
            if let Err(err) = self
                .driver
                .write_goal_position(self.settings.id, &self.settings.table, goal)
                .await
            {
                error!("failed to write goal position {}: {}", goal, err);
            }

            self.poll_until_settled().await;

            if self.settings.alternate_goals {
                self.goals.toggle();
            }
        }
    }

    async fn write_torque(&mut self, enabled: bool) -> bool {
        match self
            .driver
            .write_torque(self.settings.id, &self.settings.table, enabled)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                let action = if enabled { "enable" } else { "disable" };
                error!("failed to {} torque: {}", action, err);
                false
            }
        }
    }

    /// Reads the present position until it is within the threshold of the
    /// goal, or until the goal is known to lie outside the servo's range.
    pub async fn poll_until_settled(&mut self) -> PollOutcome {
        let goal = self.goals.current();
        let table = self.settings.table;
        loop {
            let present = match self
                .driver
                .read_present_position(self.settings.id, &table)
                .await
            {
                Ok(present) => present,
                Err(err) => {
                    error!("failed to read present position: {}", err);
                    0
                }
            };

            println!(
                "[ID:{:03}] GoalPos:{:03}  PresPos:{:03} index:{}",
                self.settings.id,
                goal,
                present,
                self.goals.index()
            );

            if (goal as i64 - present as i64).abs() <= self.settings.threshold as i64 {
                return PollOutcome::Settled { present };
            }
            if goal < table.position_min {
                warn!(
                    "goal position {} is below the lower limit {}",
                    goal, table.position_min
                );
                return PollOutcome::BelowRange;
            }
            if goal > table.position_max {
                warn!(
                    "goal position {} is above the upper limit {}",
                    goal, table.position_max
                );
                return PollOutcome::AboveRange;
            }
        }
    }
}
