use crate::error::Result;
use crate::subchannel::Subchannel;

pub trait SelectionStrategy: Send + Sync {
    fn next_subchannel(&self, subchannels: &[Subchannel]) -> Result<Subchannel>;
}
