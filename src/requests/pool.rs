//! The three mutually depleting resource counters

use serde::{Deserialize, Serialize};

/// One of the independent resource pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pool {
    Minerals,
    Gas,
    Supply,
}

impl Pool {
    pub const ALL: [Pool; 3] = [Pool::Minerals, Pool::Gas, Pool::Supply];

    pub fn index(self) -> usize {
        match self {
            Pool::Minerals => 0,
            Pool::Gas => 1,
            Pool::Supply => 2,
        }
    }
}

/// Price of an expense in each pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cost {
    pub minerals: u32,
    pub gas: u32,
    pub supply: u32,
}

impl Cost {
    pub fn new(minerals: u32, gas: u32, supply: u32) -> Self {
        Self {
            minerals,
            gas,
            supply,
        }
    }

    pub fn amount(&self, pool: Pool) -> u32 {
        match pool {
            Pool::Minerals => self.minerals,
            Pool::Gas => self.gas,
            Pool::Supply => self.supply,
        }
    }

    /// Pools this cost draws on
    pub fn pools(&self) -> impl Iterator<Item = Pool> + '_ {
        Pool::ALL.into_iter().filter(move |p| self.amount(*p) > 0)
    }
}

/// Working amounts of each pool; supply is remaining headroom
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    pub minerals: u32,
    pub gas: u32,
    pub supply: u32,
}

impl ResourcePool {
    pub fn new(minerals: u32, gas: u32, supply: u32) -> Self {
        Self {
            minerals,
            gas,
            supply,
        }
    }

    pub fn amount(&self, pool: Pool) -> u32 {
        match pool {
            Pool::Minerals => self.minerals,
            Pool::Gas => self.gas,
            Pool::Supply => self.supply,
        }
    }

    /// Pools that cannot cover `cost`
    pub fn shortfalls(&self, cost: &Cost) -> Vec<Pool> {
        cost.pools()
            .filter(|p| cost.amount(*p) > self.amount(*p))
            .collect()
    }

    pub fn can_afford(&self, cost: &Cost) -> bool {
        self.shortfalls(cost).is_empty()
    }

    pub fn deduct(&mut self, cost: &Cost) {
        self.minerals = self.minerals.saturating_sub(cost.minerals);
        self.gas = self.gas.saturating_sub(cost.gas);
        self.supply = self.supply.saturating_sub(cost.supply);
    }
}
