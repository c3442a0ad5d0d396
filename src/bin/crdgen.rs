use kube::CustomResourceExt;

use team_operator::team::Team;

/// Print the Team CRD manifest for installation into a cluster.
fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&Team::crd())?);
    Ok(())
}
