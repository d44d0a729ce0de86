use depl_monitor::crd::MonDepl;
use kube::core::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let yaml = serde_yaml::to_string(&MonDepl::crd())?;
    println!("{yaml}");
    Ok(())
}
