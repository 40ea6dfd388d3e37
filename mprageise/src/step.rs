use strum::{Display, EnumIter};

/// The stages of one cleaning run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Step {
    ValidateInputs,
    Stage,
    EstimateThreshold,
    BuildMask,
    SmoothMask,
    Unifize,
    Weight,
    EstimateBiasField,
    Combine,
    Persist,
}
